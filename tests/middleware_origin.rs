mod common;

use axum_test::TestServer;
use serde_json::{Value, json};

use api_warden::config::SecurityConfig;
use api_warden::state::SecurityOptions;

/// Origin tests run with CSRF off and a configured allow-list; the origin
/// stage only mounts when the allow-list is non-empty.
fn origin_only(config: &mut SecurityConfig, options: &mut SecurityOptions) {
    options.csrf = false;
    config.allowed_origins = vec!["https://app.example.com".to_string()];
}

#[tokio::test]
async fn test_same_host_origins_pass() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .add_header("Host", "erp.example.com")
        .add_header("Origin", "https://erp.example.com")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_allow_listed_origins_pass() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .add_header("Host", "api.internal")
        .add_header("Origin", "https://app.example.com")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_cross_origin_requests_are_rejected() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .add_header("Host", "erp.example.com")
        .add_header("Origin", "https://evil.example.com")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(response.json::<Value>()["error"], "Origin not allowed");
}

#[tokio::test]
async fn test_unparsable_origin_is_rejected() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .add_header("Host", "erp.example.com")
        .add_header("Origin", "nonsense-without-scheme")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(response.json::<Value>()["error"], "Invalid origin");
}

#[tokio::test]
async fn test_requests_without_origin_pass() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    // curl and native clients send neither Origin nor Referer.
    let response = server
        .post("/api/clientes")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_referer_is_used_when_origin_is_absent() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let allowed = server
        .post("/api/clientes")
        .add_header("Host", "erp.example.com")
        .add_header("Referer", "https://app.example.com/dashboard")
        .json(&json!({ "nome": "Ana" }))
        .await;
    assert_eq!(allowed.status_code(), 201);

    let rejected = server
        .post("/api/clientes")
        .add_header("Host", "erp.example.com")
        .add_header("Referer", "https://evil.example.com/page")
        .json(&json!({ "nome": "Ana" }))
        .await;
    assert_eq!(rejected.status_code(), 403);
}

#[tokio::test]
async fn test_safe_methods_bypass_origin_checks() {
    let (state, _audit_dir) = common::secure_state_with(origin_only).await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .get("/api/clientes")
        .add_header("Origin", "https://evil.example.com")
        .await;

    response.assert_status_ok();
}
