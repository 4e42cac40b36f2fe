// Library root
// -----------
// Client for the Joplin desktop app's local data API. The binary
// (`main.rs`) parses arguments and drives these modules.
//
// Module responsibilities:
// - `api`: HTTP transport bound to the discovered port; attaches the token.
// - `port`: finds which port in the configured range the service uses.
// - `auth`: cached token lookup and the request/poll/accept handshake.
// - `notes`: note records and the CRUD operations built on `api`.
// - `client`: ties port discovery and authentication into one session.
// - `ui`: terminal flows used by the binary (spinner, prompts, output).
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod notes;
pub mod port;
pub mod ui;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use notes::{Note, NoteFormat, NoteRepository, Page};
