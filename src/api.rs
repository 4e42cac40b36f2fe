// API client module: the single place that talks HTTP to the Joplin
// data API. It wraps one reqwest blocking client (and therefore one
// connection pool) that is cloned into every caller, the base URL of the
// discovered service and the API token once one is known.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const PING_PATH: &[&str] = &["ping"];

/// Build the shared HTTP client. Every request gets `request_timeout`
/// unless it sets a shorter one itself.
pub fn build_http_client(request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|err| Error::network("building the HTTP client", err))
}

/// HTTP executor bound to one `host:port`. Attaches `token=...` to the
/// query of every request once a token has been set.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// A successful (2xx) response, fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::DeserializationFailure {
            context: context.to_string(),
            source,
        })
    }
}

impl ApiClient {
    pub fn new(client: Client, host: &str, port: u16) -> Self {
        ApiClient {
            client,
            base_url: format!("{}:{}", host.trim_end_matches('/'), port),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the API token for subsequent calls.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// URL of `segments` under the base URL, each one percent-encoded as a
    /// single path segment. An empty last segment gives a trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || Error::InvalidUrl {
            url: self.base_url.clone(),
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Liveness probe. Any 2xx answer on `/ping` within `timeout` counts.
    pub fn ping(&self, timeout: Duration) -> Result<()> {
        let url = self.endpoint(PING_PATH)?;
        debug!(url = %url, "probing");
        let res = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|err| Error::network(format!("probing {url}"), err))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                code: status.as_u16(),
                context: format!("probing {url}"),
            });
        }
        Ok(())
    }

    /// Send one request and read the whole body. Non-2xx answers become
    /// `UnexpectedStatus`; the body is not interpreted here.
    pub fn execute(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
        context: &str,
    ) -> Result<ApiResponse> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut req = self.client.request(method.clone(), url).query(query);
        if let Some(token) = &self.token {
            req = req.query(&[("token", token.as_str())]);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        debug!(%method, path = %path, "sending request");
        let res = req.send().map_err(|err| Error::network(context, err))?;
        let status = res.status();
        if !status.is_success() {
            debug!(%method, path = %path, status = status.as_u16(), "request failed");
            return Err(Error::UnexpectedStatus {
                code: status.as_u16(),
                context: context.to_string(),
            });
        }
        let body = res.bytes().map_err(|err| Error::network(context, err))?;
        Ok(ApiResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }

    pub fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        context: &str,
    ) -> Result<ApiResponse> {
        self.execute(Method::GET, segments, query, None, context)
    }
}
