// Client configuration: where to look for the service, where the API
// token is cached and how long to wait for things. Defaults match the
// Joplin desktop app; a few environment variables override them.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_HOST: &str = "http://localhost";
pub const MIN_PORT: u16 = 41184;
pub const MAX_PORT: u16 = 41194;
pub const TOKEN_FILE_NAME: &str = ".joplin-auth-token";

/// How the authorization check endpoint is polled while the user decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub ports: RangeInclusive<u16>,
    pub token_file: PathBuf,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub poll: PollPolicy,
    /// Upper bound on pages fetched by a single `get_all`.
    pub max_pages: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            ports: MIN_PORT..=MAX_PORT,
            token_file: default_token_file(),
            probe_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            poll: PollPolicy::default(),
            max_pages: 10_000,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `JOPLIN_HOST`, `JOPLIN_PORT` (pins a single
    /// port) and `JOPLIN_TOKEN_FILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ClientConfig::default();
        if let Some(host) = lookup("JOPLIN_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().trim_end_matches('/').to_string();
        }
        if let Some(port) = lookup("JOPLIN_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.ports = port..=port,
                Err(err) => warn!(value = %port, error = %err, "ignoring invalid JOPLIN_PORT"),
            }
        }
        if let Some(path) = lookup("JOPLIN_TOKEN_FILE").filter(|p| !p.is_empty()) {
            config.token_file = PathBuf::from(path);
        }
        config
    }
}

/// `~/.joplin-auth-token`, or the current directory when there is no home.
pub fn default_token_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}
