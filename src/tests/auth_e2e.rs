use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, build_app, config::AppConfig, middleware::REQUEST_ID_HEADER};

const WEB_01: &str = "6d1f6c4e-5f3b-4c38-9a39-0f3c2b1d7e11";
const GLOBEX_01: &str = "0b7c39a5-2a8e-4f0f-8d5e-5a2f3f1c9d42";

const CONFIG: &str = r#"
[auth.oauth]
enabled = true
consumers = { billing = "s3cret" }

[auth.basic]
enabled = true

[auth.certificate]
enabled = true
subject_header = "x-ssl-client-s-dn"

[auth.trusted]
enabled = true

[user_service]
type = "static"

[[user_service.users]]
username = "alice"
password = "wonderland"

[[user_service.users]]
username = "bob"
password = "builder"

[[user_service.roles]]
name = "acme-admins"
users = ["alice"]
permissions = [{ owner_key = "acme", access = "all" }]

[[store.owners]]
key = "acme"
display_name = "ACME Corp"

[[store.owners]]
key = "globex"

[[store.consumers]]
uuid = "6d1f6c4e-5f3b-4c38-9a39-0f3c2b1d7e11"
name = "web-01"
owner = "acme"

[[store.consumers]]
uuid = "0b7c39a5-2a8e-4f0f-8d5e-5a2f3f1c9d42"
name = "globex-01"
owner = "globex"
"#;

fn test_app() -> (Router, AppState) {
    let config = AppConfig::from_str(CONFIG).unwrap();
    let state = AppState::from_config(config).unwrap();
    (build_app(state.clone()), state)
}

fn basic(user: &str, pass: &str) -> (&'static str, String) {
    (
        "authorization",
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass))),
    )
}

fn cert(uuid: &str) -> (&'static str, String) {
    ("x-ssl-client-s-dn", format!("CN={}, O=acme", uuid))
}

fn oauth_plaintext() -> (&'static str, String) {
    (
        "authorization",
        format!(
            "OAuth oauth_consumer_key=\"billing\", oauth_signature_method=\"PLAINTEXT\", \
             oauth_timestamp=\"{}\", oauth_nonce=\"n1\", oauth_signature=\"s3cret%26\"",
            chrono::Utc::now().timestamp()
        ),
    )
}

async fn get(app: &Router, uri: &str, headers: &[(&str, String)]) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).header("host", "gate.test");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_status_needs_no_principal() {
    let (app, _) = test_app();
    let (status, body) = get(&app, "/status", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_whoami_anonymous() {
    let (app, _) = test_app();
    let (status, body) = get(&app, "/users/me", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "no_auth");
}

#[tokio::test]
async fn test_whoami_basic_user() {
    let (app, _) = test_app();
    let (status, body) = get(&app, "/users/me", &[basic("alice", "wonderland")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "user");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["roles"][0]["name"], "acme-admins");
}

#[tokio::test]
async fn test_whoami_bad_password_is_anonymous() {
    let (app, _) = test_app();
    let (status, body) = get(&app, "/users/me", &[basic("alice", "nope")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "no_auth");
}

#[tokio::test]
async fn test_whoami_trusted_system() {
    let (app, _) = test_app();
    let (_, body) = get(&app, "/users/me", &[oauth_plaintext()]).await;
    assert_eq!(body["type"], "trusted_system");
    assert_eq!(body["system_id"], "billing");
}

#[tokio::test]
async fn test_owner_access() {
    let (app, _) = test_app();

    let (status, body) = get(&app, "/owners/acme", &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "authentication_error");

    let (status, body) = get(&app, "/owners/acme", &[basic("bob", "builder")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body) = get(&app, "/owners/acme", &[basic("alice", "wonderland")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "ACME Corp");

    let (status, _) = get(&app, "/owners/initech", &[basic("alice", "wonderland")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get(&app, "/owners/initech", &[oauth_plaintext()]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found_error");
}

#[tokio::test]
async fn test_consumer_reads_itself_and_checks_in() {
    let (app, state) = test_app();
    let uuid = Uuid::parse_str(WEB_01).unwrap();
    let before = state.consumers.find_by_uuid(uuid).await.unwrap().unwrap();
    assert!(before.last_checkin.is_none());

    let (status, body) = get(&app, &format!("/consumers/{}", WEB_01), &[cert(WEB_01)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "web-01");

    let after = state.consumers.find_by_uuid(uuid).await.unwrap().unwrap();
    assert!(after.last_checkin.is_some());

    let (status, _) = get(&app, "/owners/acme", &[cert(WEB_01)]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_consumer_cannot_read_other_org() {
    let (app, _) = test_app();

    let (status, _) = get(&app, &format!("/consumers/{}", GLOBEX_01), &[cert(WEB_01)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/owners/globex", &[cert(WEB_01)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_consumer() {
    let (app, _) = test_app();
    let missing = Uuid::new_v4();

    let (status, _) = get(&app, &format!("/consumers/{}", missing), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Org admins cannot tell a missing consumer from one in another org.
    let (status, _) = get(
        &app,
        &format!("/consumers/{}", missing),
        &[basic("alice", "wonderland")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(
        &app,
        &format!("/consumers/{}", GLOBEX_01),
        &[basic("alice", "wonderland")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get(&app, &format!("/consumers/{}", missing), &[oauth_plaintext()]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found_error");
}

#[tokio::test]
async fn test_trusted_headers() {
    let (app, _) = test_app();

    let (_, body) = get(&app, "/users/me", &[("cp-user", "bob".to_string())]).await;
    assert_eq!(body["type"], "user");
    assert_eq!(body["username"], "bob");

    let (_, body) = get(&app, "/users/me", &[("cp-consumer", WEB_01.to_string())]).await;
    assert_eq!(body["type"], "consumer");
    assert_eq!(body["consumer"]["uuid"], WEB_01);
}

#[tokio::test]
async fn test_signed_request_on_behalf_of_user() {
    let (app, _) = test_app();
    let (status, _) = get(
        &app,
        "/owners/acme",
        &[oauth_plaintext(), ("cp-user", "alice".to_string())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(
        &app,
        "/owners/acme",
        &[oauth_plaintext(), ("cp-user", "bob".to_string())],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_credentials_beat_trusted_headers() {
    let (app, _) = test_app();
    let (_, body) = get(
        &app,
        "/users/me",
        &[basic("bob", "builder"), ("cp-user", "alice".to_string())],
    )
    .await;
    assert_eq!(body["username"], "bob");
}
