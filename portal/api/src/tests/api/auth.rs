use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::prelude::FutureTimeout;
use serde_json::{json, Value};
use serial_test::serial;

use crate::api;
use crate::config::{AppConfig, HttpConfig};
use crate::database::{SessionId, UserKind};
use crate::store::{MemoryStore, SessionStore};
use crate::tests::global::{
    mock_global_state, mock_global_state_with_stores, seed_user, StoreProxy,
};

fn test_config(port: u16) -> AppConfig {
    AppConfig {
        http: HttpConfig {
            bind_address: format!("0.0.0.0:{port}").parse().unwrap(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Logs in over HTTP and hands back the raw cookie pair plus the session id
/// it carries, for tests that poke at the store directly.
async fn login(
    client: &reqwest::Client,
    port: u16,
    username: &str,
    password: &str,
) -> (String, SessionId) {
    let resp = client
        .post(format!("http://localhost:{port}/v1/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("login did not set a cookie")
        .to_string();

    let pair = set_cookie
        .split(';')
        .next()
        .expect("empty cookie header")
        .to_string();
    let value = pair.split_once('=').expect("malformed cookie pair").1;
    let session_id = SessionId::from_cookie(value).expect("cookie does not hold a session id");

    (pair, session_id)
}

#[serial]
#[tokio::test]
async fn test_login_session_flow() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");
    let (global, store, handler) = mock_global_state(test_config(port)).await;

    seed_user(&store, "admin", "hunter2", UserKind::Admin);

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("failed to build client");

    // A bad password gets the generic rejection and no cookie.
    let resp = client
        .post(format!("http://localhost:{port}/v1/login"))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(reqwest::header::SET_COOKIE).is_none());
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "ok": false, "message": "invalid credentials" }));

    let resp = client
        .post(format!("http://localhost:{port}/v1/login"))
        .json(&json!({ "username": "admin", "password": "hunter2" }))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("login did not set a cookie")
        .to_string();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    // The browser copy has no expiry of its own, the server decides when the
    // session stops being honored.
    assert!(!set_cookie.contains("Max-Age"));
    assert!(!set_cookie.contains("Expires"));

    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["redirect"], json!("/admin"));
    assert_eq!(body["role"], json!(2));
    assert_eq!(body["user"]["username"], json!("admin"));
    assert!(body["user"]["id"].is_string());

    // The jar carries the cookie on to the validation endpoint.
    let resp = client
        .get(format!("http://localhost:{port}/v1/session"))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(resp.headers().get(reqwest::header::SET_COOKIE).is_none());
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["role"], json!(2));
    assert_eq!(body["user"]["username"], json!("admin"));

    drop(global);
    drop(client);

    handler
        .cancel()
        .timeout(Duration::from_secs(1))
        .await
        .expect("failed to cancel context");

    handle
        .timeout(Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[serial]
#[tokio::test]
async fn test_session_endpoint_rejects_expired() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");
    let (global, store, handler) = mock_global_state(test_config(port)).await;

    seed_user(&store, "staff", "hunter2", UserKind::Staff);

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let (cookie, session_id) = login(&client, port, "staff", "hunter2").await;

    // Push the deadline into the past, as if the session sat idle too long.
    let expired_at = Utc::now() - ChronoDuration::seconds(30);
    store
        .extend_expiry(session_id, expired_at)
        .await
        .expect("failed to expire session");

    let resp = client
        .get(format!("http://localhost:{port}/v1/session"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "valid": false }));

    // Rejection does not touch the row, expired sessions stay expired.
    let session = store.session(session_id).expect("session row should remain");
    assert_eq!(session.expires_at, expired_at);

    drop(global);
    drop(client);

    handler
        .cancel()
        .timeout(Duration::from_secs(1))
        .await
        .expect("failed to cancel context");

    handle
        .timeout(Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[serial]
#[tokio::test]
async fn test_logout_clears_cookie_and_is_idempotent() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");
    let (global, store, handler) = mock_global_state(test_config(port)).await;

    seed_user(&store, "staff", "hunter2", UserKind::Staff);

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let (cookie, session_id) = login(&client, port, "staff", "hunter2").await;

    let resp = client
        .post(format!("http://localhost:{port}/v1/logout"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("logout did not clear the cookie");
    assert!(set_cookie.starts_with("session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "ok": true }));

    assert!(store.session(session_id).is_none());

    // The old cookie no longer authenticates.
    let resp = client
        .get(format!("http://localhost:{port}/v1/session"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "valid": false }));

    // Logging out again succeeds, with the stale cookie or none at all.
    let resp = client
        .post(format!("http://localhost:{port}/v1/logout"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "ok": true }));

    let resp = client
        .post(format!("http://localhost:{port}/v1/logout"))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "ok": true }));

    drop(global);
    drop(client);

    handler
        .cancel()
        .timeout(Duration::from_secs(1))
        .await
        .expect("failed to cancel context");

    handle
        .timeout(Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[serial]
#[tokio::test]
async fn test_store_failure_is_500() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");

    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "staff", "hunter2", UserKind::Staff);
    let proxy = StoreProxy::new(store.clone());

    let (global, handler) =
        mock_global_state_with_stores(test_config(port), proxy.clone(), store.clone()).await;

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let (cookie, _session_id) = login(&client, port, "staff", "hunter2").await;

    proxy.fail_find.store(true, Ordering::SeqCst);

    // A broken store reads as "not valid", never as a pass.
    let resp = client
        .get(format!("http://localhost:{port}/v1/session"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "valid": false }));

    let resp = client
        .get(format!("http://localhost:{port}/v1/me"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(
        body,
        json!({ "error": "session store unavailable", "ok": false })
    );

    // A failed renewal is just as fatal as a failed lookup.
    proxy.fail_find.store(false, Ordering::SeqCst);
    proxy.fail_extend.store(true, Ordering::SeqCst);

    let resp = client
        .get(format!("http://localhost:{port}/v1/session"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "valid": false }));

    drop(global);
    drop(client);

    handler
        .cancel()
        .timeout(Duration::from_secs(1))
        .await
        .expect("failed to cancel context");

    handle
        .timeout(Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
