//! CSRF double-submit guard and origin validation.

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_auth::AuthBearer;
use metrics::counter;
use serde_json::Value;
use tracing::debug;

use crate::api::dto::security::PolicyRejected;
use crate::application::services::CsrfRejection;
use crate::state::SecurityState;

/// Largest request body the guard will buffer while looking for a `_csrf`
/// field. Anything bigger is treated as carrying no body token.
const BODY_PEEK_LIMIT: usize = 256 * 1024;

/// CSRF guard for state-changing requests.
///
/// Pass-through conditions, in order: safe methods (`GET`/`HEAD`/`OPTIONS`),
/// configured ignore-path prefixes, and requests carrying a well-formed
/// bearer authorization header (token-auth API clients have no ambient
/// browser credential to forge).
///
/// Everything else must present a token via the `x-csrf-token` header, a
/// `_csrf` JSON body field, or failing both, the `_csrf` cookie itself. A
/// header/body token must match the cookie when one accompanies the request,
/// and every candidate must validate against the one-time store. Validation
/// consumes the token, so a replay fails.
///
/// # Rejections
///
/// `403` with `{error, message}` where `error` is one of `CSRF token
/// missing`, `CSRF token invalid`, `CSRF token expired` or `CSRF token
/// mismatch`.
pub async fn guard(State(state): State<SecurityState>, req: Request, next: Next) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }

    let path = req.uri().path();
    if state
        .config
        .csrf_ignore_paths
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();

    if AuthBearer::from_request_parts(&mut parts, &()).await.is_ok() {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let header_token = parts
        .headers
        .get(state.config.csrf_header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    // The body is peeked only when the header carries nothing, and is
    // restored before the handler runs.
    let (body, candidate) = match header_token {
        Some(token) => (body, Some(token)),
        None => match to_bytes(body, BODY_PEEK_LIMIT).await {
            Ok(bytes) => {
                let token = serde_json::from_slice::<Value>(&bytes)
                    .ok()
                    .and_then(|json| json.get("_csrf")?.as_str().map(str::to_owned));
                (Body::from(bytes), token)
            }
            Err(_) => {
                debug!("Request body too large for CSRF field peek");
                (Body::empty(), None)
            }
        },
    };

    let cookie = cookie_value(&parts.headers, &state.config.csrf_cookie_name).map(str::to_owned);

    // Cookie-only requests still name a token; the one-time store decides
    // whether it is live.
    let candidate = candidate.or_else(|| cookie.clone());

    let Some(candidate) = candidate else {
        return reject(CsrfRejection::Missing);
    };

    if let Some(cookie) = &cookie {
        if *cookie != candidate {
            return reject(CsrfRejection::Mismatch);
        }
    }

    if let Err(rejection) = state.csrf.validate_and_consume(&candidate) {
        return reject(rejection);
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Lightweight origin check for state-changing requests.
///
/// Uses the `Origin` header, falling back to `Referer`. Requests with
/// neither are passed through: curl and native clients send no origin and
/// are treated as same-origin. A present but unparsable value is rejected;
/// a parsed origin must match the request's `Host` header or appear in the
/// configured allow-list.
pub async fn origin_validation(
    State(state): State<SecurityState>,
    req: Request,
    next: Next,
) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }

    let raw = req
        .headers()
        .get(header::ORIGIN)
        .or_else(|| req.headers().get(header::REFERER))
        .and_then(|value| value.to_str().ok());

    let Some(raw) = raw else {
        return next.run(req).await;
    };

    let Ok(url) = url::Url::parse(raw) else {
        counter!("origin_rejections_total").increment(1);
        return (
            StatusCode::FORBIDDEN,
            Json(PolicyRejected::new(
                "Invalid origin",
                "The Origin header could not be parsed",
            )),
        )
            .into_response();
    };

    // Mirrors the browser's serialization: host plus port, with default
    // ports omitted.
    let origin_host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    let origin_ascii = url.origin().ascii_serialization();

    let matches_host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|host| host == origin_host);
    let in_allow_list = state
        .config
        .allowed_origins
        .iter()
        .any(|allowed| *allowed == origin_ascii);

    if matches_host || in_allow_list {
        return next.run(req).await;
    }

    counter!("origin_rejections_total").increment(1);
    (
        StatusCode::FORBIDDEN,
        Json(PolicyRejected::new(
            "Origin not allowed",
            "The request origin does not match this host and is not allow-listed",
        )),
    )
        .into_response()
}

fn reject(rejection: CsrfRejection) -> Response {
    counter!("csrf_rejections_total", "reason" => rejection.reason()).increment(1);
    (
        StatusCode::FORBIDDEN,
        Json(PolicyRejected::new(rejection.label(), rejection.message())),
    )
        .into_response()
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
