//! Response-observing audit middleware.
//!
//! Both middleware wrap the downstream handler: they collect request context
//! up front, let the handler run, then derive the entry's outcome from the
//! response that actually went out. Each request produces exactly one entry.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Instant;

use crate::domain::audit::{AuditAction, AuditDraft};
use crate::domain::identity::AuthUser;
use crate::state::SecurityState;
use crate::utils::client_ip::client_ip;

/// Largest request or response body copied into an audit entry.
const CAPTURE_LIMIT: usize = 64 * 1024;

static ENTITY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/([A-Za-z0-9_-]+)(?:/([^/?#]+))?").unwrap());

/// Audit trail for DELETE requests under `/api`.
///
/// When the facade was built with an entity snapshot accessor, the targeted
/// record is fetched before the handler runs and stored as the entry's
/// `previous` snapshot; deletions then carry what was deleted, not just its
/// id.
pub async fn delete_audit(
    State(state): State<SecurityState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::DELETE || !req.uri().path().starts_with("/api/") {
        return next.run(req).await;
    }

    let context = RequestCapture::collect(&state, &req);

    let previous = match (&state.options.entity_snapshot, &context.entity, &context.entity_id) {
        (Some(snapshot), Some(entity), Some(id)) => snapshot(entity, id).await,
        _ => None,
    };

    let started = Instant::now();
    let response = next.run(req).await;

    let (response, mut draft) = finish_draft(response, context, started, previous).await;
    // A deletion's interesting snapshot is what existed before it.
    draft.new_data = None;
    state.audit.log(AuditAction::Delete, draft).await;

    response
}

/// Audit trail for all state-changing requests under `/api`.
///
/// Maps POST to CREATE, PUT/PATCH to UPDATE and DELETE to DELETE, capturing
/// the JSON request body and, for successful writes, the JSON response body
/// as the `new` snapshot. Both pass through field redaction before
/// persistence.
pub async fn write_audit(
    State(state): State<SecurityState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(action) = method_action(req.method()) else {
        return next.run(req).await;
    };
    if !req.uri().path().starts_with("/api/") {
        return next.run(req).await;
    }
    // The delete observer owns DELETE when both stages are mounted; logging
    // here as well would duplicate every deletion.
    if action == AuditAction::Delete && state.options.audit_deletes {
        return next.run(req).await;
    }

    let context = RequestCapture::collect(&state, &req);

    let (parts, body) = req.into_parts();
    let (body, request_body) = if capturable_json(&parts.headers) {
        match to_bytes(body, CAPTURE_LIMIT).await {
            Ok(bytes) => {
                let json = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
                (Body::from(bytes), json)
            }
            Err(_) => (Body::empty(), Value::Null),
        }
    } else {
        (body, Value::Null)
    };
    let req = Request::from_parts(parts, body);

    let started = Instant::now();
    let response = next.run(req).await;

    let (response, mut draft) = finish_draft(response, context, started, None).await;
    draft.request_body = Some(request_body);
    if let Some(Value::Object(meta)) = draft.metadata.as_mut() {
        meta.insert("statusCode".to_string(), json!(response.status().as_u16()));
    }

    // A creation's id exists only in the response, never in the path.
    if draft.entity_id.is_none() {
        draft.entity_id = draft
            .new_data
            .as_ref()
            .and_then(|data| data.get("id"))
            .or_else(|| draft.request_body.as_ref().and_then(|body| body.get("id")))
            .and_then(id_text);
    }

    // Only creations and updates carry a meaningful "new" snapshot.
    if !matches!(action, AuditAction::Create | AuditAction::Update) {
        draft.new_data = None;
    }

    state.audit.log(action, draft).await;

    response
}

/// Request-side fields gathered before the handler consumes the request.
struct RequestCapture {
    method: String,
    path: String,
    query: Option<String>,
    ip: String,
    user: Option<AuthUser>,
    user_agent: Option<String>,
    entity: Option<String>,
    entity_id: Option<String>,
}

impl RequestCapture {
    fn collect(state: &SecurityState, req: &Request) -> Self {
        let path = req.uri().path().to_string();
        let (entity, entity_id) = parse_entity(&path);

        Self {
            method: req.method().as_str().to_string(),
            path,
            query: req.uri().query().map(str::to_owned),
            ip: client_ip(req.headers(), req.extensions(), state.config.behind_proxy),
            user: req.extensions().get::<AuthUser>().cloned(),
            user_agent: req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            entity,
            entity_id,
        }
    }
}

/// Observes the outgoing response and assembles the draft: status, duration,
/// error message for failures and the response body as the `new` snapshot
/// for successes.
async fn finish_draft(
    response: Response,
    context: RequestCapture,
    started: Instant,
    previous: Option<Value>,
) -> (Response, AuditDraft) {
    let duration_ms = started.elapsed().as_millis() as i64;
    let status = response.status();
    let success = status.as_u16() < 400;

    let (response, response_json) = capture_json_response(response).await;

    let error_message = if success {
        None
    } else {
        Some(extract_error(&response_json, status))
    };
    let new_data = (success && !response_json.is_null()).then_some(response_json);

    let draft = AuditDraft {
        entity: context.entity,
        entity_id: context.entity_id,
        user: context.user,
        ip: Some(context.ip),
        user_agent: context.user_agent,
        method: Some(context.method),
        path: Some(context.path),
        request_body: None,
        previous_data: previous,
        new_data,
        success,
        error_message,
        duration_ms: Some(duration_ms),
        metadata: Some(json!({ "query": context.query })),
    };

    (response, draft)
}

/// Buffers a JSON response body for inspection, rebuilding the response
/// around the same bytes. Non-JSON and unbounded responses pass through
/// untouched.
async fn capture_json_response(response: Response) -> (Response, Value) {
    if !capturable_json(response.headers()) {
        return (response, Value::Null);
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, CAPTURE_LIMIT).await {
        Ok(bytes) => {
            let json = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
            (Response::from_parts(parts, Body::from(bytes)), json)
        }
        Err(_) => (
            Response::from_parts(parts, Body::empty()),
            Value::Null,
        ),
    }
}

/// A body is captured only when declared JSON with a known length within
/// the capture limit; streams and large payloads pass through untouched.
fn capturable_json(headers: &HeaderMap) -> bool {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let length_ok = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<usize>().ok())
        .is_some_and(|len| len <= CAPTURE_LIMIT);

    is_json && length_ok
}

fn method_action(method: &Method) -> Option<AuditAction> {
    match *method {
        Method::POST => Some(AuditAction::Create),
        Method::PUT | Method::PATCH => Some(AuditAction::Update),
        Method::DELETE => Some(AuditAction::Delete),
        _ => None,
    }
}

/// Ids arrive as JSON numbers or strings depending on the handler.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_entity(path: &str) -> (Option<String>, Option<String>) {
    match ENTITY_PATH.captures(path) {
        Some(captures) => (
            captures.get(1).map(|m| m.as_str().to_string()),
            captures.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    }
}

/// Pulls a human-readable failure reason out of an error response body,
/// falling back to the status line.
fn extract_error(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .and_then(error_text)
        .or_else(|| body.get("message").and_then(|v| v.as_str().map(str::to_owned)))
        .unwrap_or_else(|| status.to_string())
}

/// Error fields are either plain strings or the nested
/// `{code, message, ...}` object produced by [`crate::error::AppError`].
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("message")?.as_str().map(str::to_owned),
        _ => None,
    }
}
