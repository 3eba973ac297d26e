#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Request},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tempfile::TempDir;

use api_warden::api::routes::apply_security;
use api_warden::config::SecurityConfig;
use api_warden::domain::identity::AuthUser;
use api_warden::state::{SecurityOptions, SecurityState};

/// Builds a hermetic security state: in-memory counters, file-only audit
/// sink in a fresh temp directory, proxy headers trusted so tests can pick
/// their client IP, and no background tasks.
///
/// The returned [`TempDir`] owns the audit directory; keep it alive for the
/// duration of the test.
pub async fn secure_state() -> (SecurityState, TempDir) {
    secure_state_with(|_, _| {}).await
}

/// Like [`secure_state`], with a hook to adjust config and options first.
pub async fn secure_state_with(
    configure: impl FnOnce(&mut SecurityConfig, &mut SecurityOptions),
) -> (SecurityState, TempDir) {
    let audit_dir = TempDir::new().unwrap();

    let mut config = SecurityConfig {
        behind_proxy: true,
        audit_log_dir: audit_dir.path().to_path_buf(),
        ..SecurityConfig::default()
    };
    let mut options = SecurityOptions {
        spawn_background_tasks: false,
        ..SecurityOptions::default()
    };

    configure(&mut config, &mut options);

    let state = SecurityState::build(config, options, None).await;
    (state, audit_dir)
}

/// A small business API to protect in tests.
pub fn demo_app() -> Router {
    Router::new()
        .route("/api/clientes", get(list_clientes).post(create_cliente))
        .route(
            "/api/clientes/{id}",
            put(update_cliente).delete(delete_cliente),
        )
        .route("/api/categorias/{id}", delete(delete_cliente))
        .route("/api/contas-pagar", post(create_cliente))
        .route("/api/auth/login", post(login))
        .route("/api/fail", post(always_fails))
        .route("/assets/app.js", get(asset))
}

/// The demo app behind the full security stack.
pub fn protected_app(state: SecurityState) -> Router {
    apply_security(demo_app(), state)
}

/// Wraps `app` so every request carries `user` in its extensions, the way a
/// host application's authentication middleware would.
pub fn authenticated_as(app: Router, user: AuthUser) -> Router {
    app.layer(middleware::map_request(move |mut req: Request| {
        let user = user.clone();
        async move {
            req.extensions_mut().insert(user);
            req
        }
    }))
}

/// Reads every entry from every audit day file, in file order.
pub async fn audit_entries(audit_dir: &TempDir) -> Vec<Value> {
    let mut dir = match tokio::fs::read_dir(audit_dir.path()).await {
        Ok(dir) => dir,
        Err(_) => return Vec::new(),
    };

    let mut entries = Vec::new();
    while let Some(file) = dir.next_entry().await.unwrap() {
        let content = tokio::fs::read_to_string(file.path()).await.unwrap();
        for line in content.lines() {
            entries.push(serde_json::from_str(line).unwrap());
        }
    }
    entries
}

async fn list_clientes() -> Json<Value> {
    Json(json!([]))
}

async fn create_cliente(body: Option<Json<Value>>) -> (StatusCode, Json<Value>) {
    let echo = body.map(|Json(v)| v).unwrap_or(Value::Null);
    (StatusCode::CREATED, Json(json!({ "id": 1, "data": echo })))
}

async fn update_cliente(Path(id): Path<i64>, _body: Option<Json<Value>>) -> Json<Value> {
    Json(json!({ "id": id, "updated": true }))
}

async fn delete_cliente(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "success": true, "id": id }))
}

async fn login() -> Json<Value> {
    Json(json!({ "token": "session" }))
}

async fn always_fails() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "boom" })),
    )
}

async fn asset() -> &'static str {
    "console.log('ok');"
}
