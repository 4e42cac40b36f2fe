// Session setup: find the service, obtain a token, hand out the note
// repository. One `Client` per process; it is passed explicitly to
// whatever needs it.

use crate::api::{build_http_client, ApiClient};
use crate::auth::{AuthSession, Sleeper, ThreadSleeper, TokenStore};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::notes::NoteRepository;
use crate::port::PortLocator;

pub struct Client {
    port: u16,
    notes: NoteRepository,
}

impl Client {
    /// Locate the service, then authenticate, blocking between checks.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Self::connect_with(config, &mut ThreadSleeper::new())
    }

    /// Same as `connect` with a caller-supplied wait between checks.
    pub fn connect_with(config: &ClientConfig, sleeper: &mut dyn Sleeper) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;

        let locator = PortLocator::new(
            http.clone(),
            &config.host,
            config.ports.clone(),
            config.probe_timeout,
        );
        let port = locator.locate()?;

        let mut api = ApiClient::new(http, &config.host, port);
        let store = TokenStore::new(config.token_file.clone());
        let token = AuthSession::new(&api, &store, config.poll).authenticate(sleeper)?;
        api.set_token(&token);

        Ok(Client {
            port,
            notes: NoteRepository::new(api, config.max_pages),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn token(&self) -> Option<&str> {
        self.notes.api().token()
    }

    pub fn notes(&self) -> &NoteRepository {
        &self.notes
    }
}
