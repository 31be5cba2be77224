//! HTTP tests over the in-memory store

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use mailcast_common::Config;
use mailcast_core::{MemoryTransport, Repositories, Services};
use mailcast_storage::MemoryStore;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-secret";
const PASSWORD: &str = "s3cret-pass";

struct TestApp {
    server: TestServer,
    transport: MemoryTransport,
}

async fn app_with(transport: MemoryTransport) -> TestApp {
    let mut config = Config::from_toml_str("[database]\n").unwrap();
    config.mail.from_address = "robot@example.com".to_string();
    config.server.base_url = "http://mailcast.test".to_string();

    let repos = Repositories::in_memory(MemoryStore::new());
    let services = Services::new(repos, Arc::new(transport.clone()), &config);
    services
        .accounts
        .ensure_superuser(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let router = create_router(Arc::new(AppState::new(services, None)));
    TestApp {
        server: TestServer::new(router).unwrap(),
        transport,
    }
}

async fn app() -> TestApp {
    app_with(MemoryTransport::new()).await
}

fn authed(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

async fn last_mail_body(app: &TestApp, to: &str) -> String {
    app.transport
        .sent()
        .await
        .into_iter()
        .rev()
        .find(|mail| mail.to.iter().any(|addr| addr == to))
        .map(|mail| mail.body)
        .unwrap()
}

async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let response = app
        .server
        .post("/api/v1/accounts/login")
        .json(&json!({"email": email, "password": password}))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

/// Register, confirm through the mailed link and log in
async fn signed_up(app: &TestApp, email: &str) -> String {
    app.server
        .post("/api/v1/accounts/register")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "password_confirm": PASSWORD,
            "first_name": "Ann",
            "last_name": "Lee"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let body = last_mail_body(app, email).await;
    let link = body
        .split_whitespace()
        .find(|word| word.contains("/api/v1/accounts/confirm/"))
        .unwrap();
    let path = link.trim_start_matches("http://mailcast.test");
    app.server.get(path).await.assert_status_ok();

    login(app, email, PASSWORD).await
}

/// Recipient, message and mailing owned by the holder of `token`
async fn seed_mailing(app: &TestApp, token: &str, recipient_email: &str) -> String {
    let recipient = authed(app.server.post("/api/v1/recipients"), token)
        .json(&json!({"email": recipient_email, "name": "R"}))
        .await;
    recipient.assert_status(StatusCode::CREATED);
    let recipient_id = recipient.json::<Value>()["id"].clone();

    let message = authed(app.server.post("/api/v1/messages"), token)
        .json(&json!({"subject": "Hello", "body": "World"}))
        .await;
    message.assert_status(StatusCode::CREATED);
    let message_id = message.json::<Value>()["id"].clone();

    let mailing = authed(app.server.post("/api/v1/mailings"), token)
        .json(&json!({"message_id": message_id, "recipient_ids": [recipient_id]}))
        .await;
    mailing.assert_status(StatusCode::CREATED);
    let mailing = mailing.json::<Value>();
    assert_eq!(mailing["status"], json!("created"));
    mailing["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_docs_are_public() {
    let app = app().await;

    let health = app.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>(), json!({"status": "healthy"}));
    app.server.get("/health/live").await.assert_status_ok();
    app.server.get("/health/ready").await.assert_status_ok();
    app.server.get("/openapi.json").await.assert_status_ok();
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = app().await;

    let response = app.server.get("/api/v1/mailings").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], json!("UNAUTHORIZED"));

    authed(app.server.get("/api/v1/mailings"), "not-a-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unconfirmed_account_cannot_log_in() {
    let app = app().await;
    app.server
        .post("/api/v1/accounts/register")
        .json(&json!({
            "email": "new@example.com",
            "password": PASSWORD,
            "password_confirm": PASSWORD,
            "first_name": "New",
            "last_name": "User"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .post("/api/v1/accounts/login")
        .json(&json!({"email": "new@example.com", "password": PASSWORD}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/v1/accounts/confirm/bogus")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_rejects_mismatched_passwords() {
    let app = app().await;
    let response = app
        .server
        .post("/api/v1/accounts/register")
        .json(&json!({
            "email": "new@example.com",
            "password": PASSWORD,
            "password_confirm": "something-else",
            "first_name": "New",
            "last_name": "User"
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["error"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_owner_launch_completes_mailing() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let mailing_id = seed_mailing(&app, &alice, "r@example.com").await;

    let response = authed(app.server.post(&format!("/api/v1/mailings/{}/send", mailing_id)), &alice).await;
    response.assert_status_ok();
    let outcome = response.json::<Value>();
    assert_eq!(outcome["mailing"]["status"], json!("completed"));
    assert_eq!(outcome["attempt"]["status"], json!("success"));

    let body = last_mail_body(&app, "r@example.com").await;
    assert_eq!(body, "World");

    let attempts = authed(app.server.get("/api/v1/attempts"), &alice).await.json::<Value>();
    assert_eq!(attempts.as_array().unwrap().len(), 1);

    let again = authed(app.server.post(&format!("/api/v1/mailings/{}/send", mailing_id)), &alice).await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<Value>()["error"], json!("INVALID_TRANSITION"));
}

#[tokio::test]
async fn test_transport_failure_is_logged_as_failed_attempt() {
    let app = app_with(MemoryTransport::failing("550 mailbox unavailable")).await;
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let mailing_id = seed_mailing(&app, &token, "r@example.com").await;

    let response = authed(app.server.post(&format!("/api/v1/mailings/{}/send", mailing_id)), &token).await;
    response.assert_status_ok();
    let outcome = response.json::<Value>();
    assert_eq!(outcome["mailing"]["status"], json!("completed"));
    assert_eq!(outcome["attempt"]["status"], json!("failure"));
    assert_eq!(outcome["attempt"]["server_response"], json!("550 mailbox unavailable"));
}

#[tokio::test]
async fn test_other_user_cannot_launch_or_see_mailing() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let bob = signed_up(&app, "bob@example.com").await;
    let mailing_id = seed_mailing(&app, &alice, "r@example.com").await;
    let path = format!("/api/v1/mailings/{}", mailing_id);

    let response = authed(app.server.post(&format!("{}/send", path)), &bob).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], json!("FORBIDDEN"));

    authed(app.server.get(&path), &bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let listed = authed(app.server.get("/api/v1/mailings"), &bob).await.json::<Value>();
    assert_eq!(listed, json!([]));

    let detail = authed(app.server.get(&path), &alice).await.json::<Value>();
    assert_eq!(detail["status"], json!("created"));
    assert_eq!(detail["message"]["subject"], json!("Hello"));
    let attempts = authed(app.server.get("/api/v1/attempts"), &alice).await.json::<Value>();
    assert_eq!(attempts, json!([]));
}

#[tokio::test]
async fn test_stop_needs_permission_and_is_idempotent() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let mailing_id = seed_mailing(&app, &alice, "r@example.com").await;
    let stop = format!("/api/v1/mailings/{}/stop", mailing_id);

    authed(app.server.post(&stop), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let first = authed(app.server.post(&stop), &admin).await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["status"], json!("stopped"));
    let second = authed(app.server.post(&stop), &admin).await;
    second.assert_status_ok();
    assert_eq!(second.json::<Value>()["status"], json!("stopped"));

    authed(app.server.post(&format!("/api/v1/mailings/{}/send", mailing_id)), &alice)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_granted_stop_permission_lets_a_user_stop() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let mailing_id = seed_mailing(&app, &alice, "r@example.com").await;

    let users = authed(app.server.get("/api/v1/users"), &admin).await.json::<Value>();
    let alice_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == json!("alice@example.com"))
        .map(|u| u["id"].as_str().unwrap().to_string())
        .unwrap();

    let roles = authed(app.server.put(&format!("/api/v1/users/{}/roles", alice_id)), &admin)
        .json(&json!({"groups": ["users"], "permissions": ["mailing.stop"]}))
        .await;
    roles.assert_status_ok();
    assert_eq!(roles.json::<Value>()["roles"]["permissions"], json!(["mailing.stop"]));

    authed(app.server.post(&format!("/api/v1/mailings/{}/stop", mailing_id)), &alice)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_mailing_references_must_exist() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;

    let response = authed(app.server.post("/api/v1/mailings"), &alice)
        .json(&json!({"message_id": "018f0000-0000-7000-8000-000000000000"}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_recipient_emails_are_unique() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let bob = signed_up(&app, "bob@example.com").await;

    authed(app.server.post("/api/v1/recipients"), &alice)
        .json(&json!({"email": "r@example.com", "name": "R"}))
        .await
        .assert_status(StatusCode::CREATED);
    authed(app.server.post("/api/v1/recipients"), &bob)
        .json(&json!({"email": "r@example.com", "name": "Other"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_message_delete_removes_its_mailings() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let mailing_id = seed_mailing(&app, &alice, "r@example.com").await;

    let detail = authed(app.server.get(&format!("/api/v1/mailings/{}", mailing_id)), &alice)
        .await
        .json::<Value>();
    let message_id = detail["message_id"].as_str().unwrap().to_string();

    authed(app.server.delete(&format!("/api/v1/messages/{}", message_id)), &alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    authed(app.server.get(&format!("/api/v1/mailings/{}", mailing_id)), &alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let listed = authed(app.server.get("/api/v1/mailings"), &alice).await.json::<Value>();
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;

    authed(app.server.post("/api/v1/accounts/logout"), &alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    authed(app.server.get("/api/v1/stats"), &alice)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = app().await;
    signed_up(&app, "alice@example.com").await;

    app.server
        .post("/api/v1/accounts/password-recovery")
        .json(&json!({"email": "nobody@example.com"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    app.server
        .post("/api/v1/accounts/password-recovery")
        .json(&json!({"email": "alice@example.com"}))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let body = last_mail_body(&app, "alice@example.com").await;
    let mut lines = body.lines();
    lines.find(|line| line.ends_with("password-reset:")).unwrap();
    let code = lines.next().unwrap().trim().to_string();

    app.server
        .post("/api/v1/accounts/password-reset")
        .json(&json!({"token": code, "password": "brand-new-pass", "password_confirm": "brand-new-pass"}))
        .await
        .assert_status_ok();
    app.server
        .post("/api/v1/accounts/password-reset")
        .json(&json!({"token": code, "password": "another-pass", "password_confirm": "another-pass"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    app.server
        .post("/api/v1/accounts/login")
        .json(&json!({"email": "alice@example.com", "password": PASSWORD}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    login(&app, "alice@example.com", "brand-new-pass").await;
}

#[tokio::test]
async fn test_user_administration() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    authed(app.server.get("/api/v1/users"), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let users = authed(app.server.get("/api/v1/users"), &admin).await.json::<Value>();
    assert_eq!(users.as_array().unwrap().len(), 2);
    let alice_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == json!("alice@example.com"))
        .map(|u| u["id"].as_str().unwrap().to_string())
        .unwrap();

    let blocked = authed(app.server.post(&format!("/api/v1/users/{}/block", alice_id)), &admin).await;
    blocked.assert_status_ok();
    assert_eq!(blocked.json::<Value>()["is_active"], json!(false));
    authed(app.server.get("/api/v1/stats"), &alice)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    authed(app.server.post(&format!("/api/v1/users/{}/unblock", alice_id)), &admin)
        .await
        .assert_status_ok();
    login(&app, "alice@example.com", PASSWORD).await;
}

#[tokio::test]
async fn test_stats_count_mailings_and_recipients() {
    let app = app().await;
    let alice = signed_up(&app, "alice@example.com").await;
    seed_mailing(&app, &alice, "r@example.com").await;
    seed_mailing(&app, &alice, "s@example.com").await;

    let stats = authed(app.server.get("/api/v1/stats"), &alice).await.json::<Value>();
    assert_eq!(
        stats,
        json!({"total_mailings": 2, "active_mailings": 0, "unique_recipients": 2})
    );
}

#[tokio::test]
async fn test_contact_form_thanks_sender() {
    let app = app().await;
    let response = app
        .server
        .post("/api/v1/contacts")
        .json(&json!({"name": "Ann", "phone": "+100", "message": "Hi there"}))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["message"],
        json!("Thank you, Ann! Your message has been received.")
    );
}
