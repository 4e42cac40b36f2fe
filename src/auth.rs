// API token acquisition.
//
// A token cached on disk is trusted as-is. Without one, the client asks
// Joplin for authorization, polls until the user accepts or rejects the
// request in the app, and caches the issued token for the next run.

use crate::api::ApiClient;
use crate::config::PollPolicy;
use crate::error::{Error, Result};
use reqwest::Method;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const AUTH_PATH: &[&str] = &["auth"];
pub const AUTH_CHECK_PATH: &[&str] = &["auth", "check"];

/// Token file holding one whitespace-trimmed API token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(data) => {
                let token = data.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::TokenStore {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrite the file with `token`, readable by the owner only.
    pub fn save(&self, token: &str) -> Result<()> {
        let to_err = |source| Error::TokenStore {
            path: self.path.clone(),
            source,
        };
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(to_err)?;
        #[cfg(unix)]
        {
            // mode() only applies on creation; tighten an existing file
            // before the token lands in it
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(to_err)?;
        }
        file.write_all(token.as_bytes()).map_err(to_err)?;
        Ok(())
    }
}

/// The wait between two authorization checks. Returning an error aborts
/// the handshake.
pub trait Sleeper {
    fn sleep(&mut self, interval: Duration) -> Result<()>;
}

impl<F> Sleeper for F
where
    F: FnMut(Duration) -> Result<()>,
{
    fn sleep(&mut self, interval: Duration) -> Result<()> {
        self(interval)
    }
}

/// Blocks the current thread, unless the optional cancel flag is raised.
#[derive(Debug, Clone, Default)]
pub struct ThreadSleeper {
    cancel: Option<Arc<AtomicBool>>,
}

impl ThreadSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: Arc<AtomicBool>) -> Self {
        ThreadSleeper {
            cancel: Some(cancel),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, interval: Duration) -> Result<()> {
        if self.cancelled() {
            return Err(Error::Cancelled);
        }
        std::thread::sleep(interval);
        if self.cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Answer of `POST /auth`.
#[derive(Debug, Deserialize)]
struct AuthRequestResponse {
    auth_token: String,
    #[serde(default)]
    status: Option<String>,
}

/// Answer of `GET /auth/check`.
#[derive(Debug, Deserialize)]
struct AuthCheckResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Where a single handshake stands after one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStatus {
    Waiting,
    Accepted(String),
    Rejected,
}

impl HandshakeStatus {
    fn from_check(check: AuthCheckResponse) -> Result<Self> {
        match check.status.as_deref() {
            Some("waiting") => Ok(HandshakeStatus::Waiting),
            Some("rejected") => Ok(HandshakeStatus::Rejected),
            Some("accepted") => match check.token {
                Some(token) if !token.trim().is_empty() => {
                    Ok(HandshakeStatus::Accepted(token.trim().to_string()))
                }
                _ => Err(Error::protocol("request accepted but no token was issued")),
            },
            Some(other) => Err(Error::protocol(format!("unknown status `{other}`"))),
            None => Err(Error::protocol("check response has no status")),
        }
    }
}

/// Acquires the API token for one service instance.
pub struct AuthSession<'a> {
    api: &'a ApiClient,
    store: &'a TokenStore,
    policy: PollPolicy,
}

impl<'a> AuthSession<'a> {
    pub fn new(api: &'a ApiClient, store: &'a TokenStore, policy: PollPolicy) -> Self {
        AuthSession { api, store, policy }
    }

    /// Cached token if there is one, otherwise a full handshake.
    pub fn authenticate(&self, sleeper: &mut dyn Sleeper) -> Result<String> {
        if let Some(token) = self.store.load()? {
            info!(path = %self.store.path().display(), "using cached API token");
            return Ok(token);
        }
        let token = self.handshake(sleeper)?;
        self.store.save(&token)?;
        info!(path = %self.store.path().display(), "API token saved");
        Ok(token)
    }

    fn handshake(&self, sleeper: &mut dyn Sleeper) -> Result<String> {
        info!(base_url = self.api.base_url(), "requesting authorization from Joplin");
        let request: AuthRequestResponse = self
            .api
            .execute(Method::POST, AUTH_PATH, &[], None, "requesting authorization")?
            .json("reading the authorization request")?;
        debug!(status = ?request.status, "authorization requested");

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let check: AuthCheckResponse = self
                .api
                .get(
                    AUTH_CHECK_PATH,
                    &[("auth_token", request.auth_token.clone())],
                    "checking authorization",
                )?
                .json("reading the authorization check")?;

            match HandshakeStatus::from_check(check)? {
                HandshakeStatus::Accepted(token) => {
                    info!(attempt, "authorization accepted");
                    return Ok(token);
                }
                HandshakeStatus::Rejected => {
                    warn!(attempt, "authorization rejected");
                    return Err(Error::AuthorizationRejected);
                }
                HandshakeStatus::Waiting => {
                    debug!(attempt, max_attempts, "waiting for user approval");
                    if attempt < max_attempts {
                        sleeper.sleep(self.policy.interval)?;
                    }
                }
            }
        }

        warn!(attempts = max_attempts, "authorization timed out");
        Err(Error::AuthorizationTimeout {
            attempts: max_attempts,
        })
    }
}
