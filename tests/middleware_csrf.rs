mod common;

use axum_test::TestServer;
use serde_json::{Value, json};

async fn issue_token(server: &TestServer) -> String {
    let response = server.get("/api/csrf-token").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_unsafe_request_without_token_is_rejected() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 403);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "CSRF token missing");
    assert!(body["message"].as_str().unwrap().contains("x-csrf-token"));
}

#[tokio::test]
async fn test_issued_token_authorizes_exactly_one_request() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server.get("/api/csrf-token").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(body["expires"].as_u64().unwrap() > 0);

    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with(&format!("_csrf={token}")));
    assert!(cookie.contains("SameSite=Strict"));

    let accepted = server
        .post("/api/clientes")
        .add_header("x-csrf-token", token.clone())
        .add_header("Cookie", format!("_csrf={token}"))
        .json(&json!({ "nome": "Ana" }))
        .await;
    assert_eq!(accepted.status_code(), 201);

    // Validation consumed the token, so the same request replayed fails.
    let replayed = server
        .post("/api/clientes")
        .add_header("x-csrf-token", token.clone())
        .add_header("Cookie", format!("_csrf={token}"))
        .json(&json!({ "nome": "Ana" }))
        .await;
    assert_eq!(replayed.status_code(), 403);
    assert_eq!(replayed.json::<Value>()["error"], "CSRF token invalid");
}

#[tokio::test]
async fn test_cookie_and_header_disagreement_is_rejected() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let token = issue_token(&server).await;

    let response = server
        .post("/api/clientes")
        .add_header("x-csrf-token", token)
        .add_header("Cookie", "_csrf=0000000000000000000000000000000000000000000000000000000000000000")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(response.json::<Value>()["error"], "CSRF token mismatch");
}

#[tokio::test]
async fn test_token_in_json_body_is_accepted() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let token = issue_token(&server).await;

    let response = server
        .post("/api/clientes")
        .json(&json!({ "nome": "Ana", "_csrf": token }))
        .await;

    assert_eq!(response.status_code(), 201);
    // The guard restored the body after peeking at it.
    assert_eq!(response.json::<Value>()["data"]["nome"], "Ana");
}

#[tokio::test]
async fn test_cookie_is_the_last_resort_token_source() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let token = issue_token(&server).await;

    // No header and no body field: the cookie itself names the token, and
    // the one-time store still gates it.
    let response = server
        .post("/api/clientes")
        .add_header("Cookie", format!("_csrf={token}"))
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_bearer_clients_are_exempt() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/clientes")
        .add_header("Authorization", "Bearer api-client-key")
        .json(&json!({ "nome": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_ignored_path_prefixes_skip_the_guard() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "ana@example.com", "password": "secret" }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_safe_methods_pass_without_tokens() {
    let (state, _audit_dir) = common::secure_state().await;
    let server = TestServer::new(common::protected_app(state)).unwrap();

    let response = server.get("/api/clientes").await;

    response.assert_status_ok();
}
