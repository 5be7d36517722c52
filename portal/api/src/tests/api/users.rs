use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::prelude::FutureTimeout;
use serde_json::{json, Value};
use serial_test::serial;

use crate::api;
use crate::config::{AppConfig, HttpConfig};
use crate::database::{SessionId, UserKind};
use crate::store::SessionStore;
use crate::tests::global::{mock_global_state, seed_user};

fn test_config(port: u16) -> AppConfig {
    AppConfig {
        http: HttpConfig {
            bind_address: format!("0.0.0.0:{port}").parse().unwrap(),
            ..Default::default()
        },
        ..Default::default()
    }
}

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
async fn test_me_and_admin_listing() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");
    let (global, store, handler) = mock_global_state(test_config(port)).await;

    seed_user(&store, "admin", "hunter2", UserKind::Admin);
    seed_user(&store, "staff", "hunter2", UserKind::Staff);

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let (staff_cookie, _) = login(&client, port, "staff", "hunter2").await;
    let (admin_cookie, _) = login(&client, port, "admin", "hunter2").await;

    let resp = client
        .get(format!("http://localhost:{port}/v1/me"))
        .header(reqwest::header::COOKIE, &staff_cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body["username"], json!("staff"));
    assert_eq!(body["role"], json!(1));
    assert!(body["id"].is_string());

    // The listing is admin only.
    let resp = client
        .get(format!("http://localhost:{port}/v1/users"))
        .header(reqwest::header::COOKIE, &staff_cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "error": "forbidden", "ok": false }));

    let resp = client
        .get(format!("http://localhost:{port}/v1/users"))
        .header(reqwest::header::COOKIE, &admin_cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.expect("failed to parse response");
    let users = body["users"].as_array().expect("users should be an array");
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], json!("admin"));
    assert_eq!(users[0]["role"], json!(2));
    assert_eq!(users[1]["username"], json!("staff"));
    assert_eq!(users[1]["role"], json!(1));
    assert_eq!(users[1]["display_name"], json!("staff"));

    // No cookie, no identity.
    let resp = client
        .get(format!("http://localhost:{port}/v1/me"))
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("failed to parse response");
    assert_eq!(body, json!({ "error": "not logged in", "ok": false }));

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
async fn test_authenticated_call_slides_expiry() {
    let port = portpicker::pick_unused_port().expect("failed to pick port");
    let (global, store, handler) = mock_global_state(test_config(port)).await;

    seed_user(&store, "staff", "hunter2", UserKind::Staff);

    let handle = tokio::spawn(api::run(global.clone()));

    // We need to wait for the server to start
    tokio::time::sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let (cookie, session_id) = login(&client, port, "staff", "hunter2").await;

    // Shrink the session to its last two minutes.
    store
        .extend_expiry(session_id, Utc::now() + ChronoDuration::seconds(120))
        .await
        .expect("failed to shrink session");

    // Any authenticated API call renews as a side effect.
    let resp = client
        .get(format!("http://localhost:{port}/v1/me"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .expect("failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let session = store.session(session_id).expect("session should exist");
    assert!(session.expires_at > Utc::now() + ChronoDuration::seconds(895));

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
