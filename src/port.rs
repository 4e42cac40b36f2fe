// Discovery of the port the Joplin data API listens on.
//
// Candidates are probed one at a time in ascending order and the first
// port that answers `/ping` with a 2xx wins; later ports are never
// touched.

use crate::api::ApiClient;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

pub struct PortLocator {
    client: Client,
    host: String,
    candidates: Vec<u16>,
    probe_timeout: Duration,
}

impl PortLocator {
    pub fn new(
        client: Client,
        host: &str,
        candidates: impl IntoIterator<Item = u16>,
        probe_timeout: Duration,
    ) -> Self {
        let mut candidates: Vec<u16> = candidates.into_iter().collect();
        candidates.sort_unstable();
        candidates.dedup();
        PortLocator {
            client,
            host: host.to_string(),
            candidates,
            probe_timeout,
        }
    }

    pub fn candidates(&self) -> &[u16] {
        &self.candidates
    }

    /// Return the first live port, or `NoServiceFound` carrying the last
    /// probe failure.
    pub fn locate(&self) -> Result<u16> {
        let mut last_error = String::from("no ports to probe");
        for &port in &self.candidates {
            let api = ApiClient::new(self.client.clone(), &self.host, port);
            match api.ping(self.probe_timeout) {
                Ok(()) => {
                    info!(port, "found Joplin service");
                    return Ok(port);
                }
                Err(err) => {
                    debug!(port, error = %err, "port did not answer");
                    last_error = err.to_string();
                }
            }
        }
        Err(Error::NoServiceFound {
            first: self.candidates.first().copied().unwrap_or_default(),
            last: self.candidates.last().copied().unwrap_or_default(),
            last_error,
        })
    }
}
