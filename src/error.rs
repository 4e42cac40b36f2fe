// Error taxonomy shared by every layer of the client. The CLI maps each
// variant to a message and a non-zero exit; the library never exits.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No candidate port answered the liveness probe.
    #[error("no Joplin service found on ports {first}-{last} (last error: {last_error})")]
    NoServiceFound {
        first: u16,
        last: u16,
        last_error: String,
    },

    #[error("invalid service URL `{url}`")]
    InvalidUrl { url: String },

    #[error("network failure while {context}")]
    NetworkFailure {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {code} while {context}")]
    UnexpectedStatus { code: u16, context: String },

    #[error("authorization request was rejected in Joplin")]
    AuthorizationRejected,

    #[error("authorization was not approved after {attempts} checks")]
    AuthorizationTimeout { attempts: u32 },

    #[error("unexpected authorization response: {message}")]
    ProtocolError { message: String },

    #[error("unknown note format `{format}` (expected `markdown` or `html`)")]
    UnknownFormat { format: String },

    /// Update arguments must come in field/value pairs.
    #[error("field `{field}` has no value")]
    UnpairedField { field: String },

    #[error("could not parse response while {context}")]
    DeserializationFailure {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("service still reported more notes after {pages} pages")]
    PaginationLimit { pages: u32 },

    #[error("token file {}", path.display())]
    TokenStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        Error::NetworkFailure {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::ProtocolError {
            message: message.into(),
        }
    }
}
