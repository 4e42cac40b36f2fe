#![allow(dead_code)]

use httpmock::MockServer;
use joplin_cli::api::{build_http_client, ApiClient};
use std::net::TcpListener;
use std::time::Duration;

pub const HOST: &str = "http://127.0.0.1";

/// A bound port that accepts connections but never answers. Keep the
/// listener alive for the whole test so no other server can take the port.
pub fn silent_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub fn api_for(server: &MockServer) -> ApiClient {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    ApiClient::new(http, HOST, server.port())
}

pub fn authed_api_for(server: &MockServer, token: &str) -> ApiClient {
    let mut api = api_for(server);
    api.set_token(token);
    api
}
