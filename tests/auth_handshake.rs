mod common;

use common::api_for;
use httpmock::prelude::*;
use joplin_cli::auth::{AuthSession, TokenStore};
use joplin_cli::config::PollPolicy;
use joplin_cli::Error;
use serde_json::json;
use std::fs;
use std::time::Duration;

fn no_wait(_: Duration) -> joplin_cli::Result<()> {
    Ok(())
}

fn auth_request(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(200)
            .json_body(json!({"auth_token": "hs-1", "status": "waiting"}));
    })
}

fn auth_check<'a>(server: &'a MockServer, body: serde_json::Value) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/auth/check")
            .query_param("auth_token", "hs-1");
        then.status(200).json_body(body);
    })
}

#[test]
fn cached_token_skips_the_handshake() {
    let server = MockServer::start();
    let request = auth_request(&server);
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    fs::write(store.path(), "cached-token\n").unwrap();

    let api = api_for(&server);
    let token = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut no_wait)
        .unwrap();

    assert_eq!(token, "cached-token");
    request.assert_calls(0);
}

#[test]
fn accepted_after_waiting_persists_the_token() {
    let server = MockServer::start();
    let request = auth_request(&server);
    let mut waiting = Some(auth_check(&server, json!({"status": "waiting"})));
    let mut accepted = None;
    let mut sleeps = 0;
    let mut sleeper = |interval: Duration| -> joplin_cli::Result<()> {
        assert_eq!(interval, Duration::from_secs(1));
        sleeps += 1;
        if sleeps == 2 {
            if let Some(mut mock) = waiting.take() {
                mock.assert_calls(2);
                mock.delete();
            }
            accepted = Some(auth_check(
                &server,
                json!({"status": "accepted", "token": "tok123"}),
            ));
        }
        Ok(())
    };

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    let api = api_for(&server);
    let token = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut sleeper)
        .unwrap();

    assert_eq!(token, "tok123");
    assert_eq!(sleeps, 2);
    request.assert_calls(1);
    accepted.unwrap().assert_calls(1);
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "tok123");
}

#[test]
fn rejection_stops_polling_immediately() {
    let server = MockServer::start();
    auth_request(&server);
    let check = auth_check(&server, json!({"status": "rejected"}));
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    let mut sleeps = 0;

    let api = api_for(&server);
    let err = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut |_: Duration| -> joplin_cli::Result<()> {
            sleeps += 1;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, Error::AuthorizationRejected));
    check.assert_calls(1);
    assert_eq!(sleeps, 0);
    assert!(!store.path().exists());
}

#[test]
fn waiting_forever_times_out_after_twenty_checks() {
    let server = MockServer::start();
    auth_request(&server);
    let check = auth_check(&server, json!({"status": "waiting"}));
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));
    let mut sleeps = 0;

    let api = api_for(&server);
    let err = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut |_: Duration| -> joplin_cli::Result<()> {
            sleeps += 1;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, Error::AuthorizationTimeout { attempts: 20 }));
    check.assert_calls(20);
    assert_eq!(sleeps, 19);
    assert!(!store.path().exists());
}

#[test]
fn unknown_status_is_not_retried() {
    let server = MockServer::start();
    auth_request(&server);
    let check = auth_check(&server, json!({"status": "pending-review"}));
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));

    let api = api_for(&server);
    let err = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut no_wait)
        .unwrap_err();

    assert!(matches!(err, Error::ProtocolError { .. }));
    check.assert_calls(1);
}

#[test]
fn cancelled_wait_aborts_the_handshake() {
    let server = MockServer::start();
    auth_request(&server);
    let check = auth_check(&server, json!({"status": "waiting"}));
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));

    let api = api_for(&server);
    let err = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut |_: Duration| -> joplin_cli::Result<()> { Err(Error::Cancelled) })
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    check.assert_calls(1);
}

#[test]
fn failed_authorization_request_surfaces_the_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(503);
    });
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token"));

    let api = api_for(&server);
    let err = AuthSession::new(&api, &store, PollPolicy::default())
        .authenticate(&mut no_wait)
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedStatus { code: 503, .. }));
}
