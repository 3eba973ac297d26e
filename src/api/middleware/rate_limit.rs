//! Category-based rate limiting middleware with IP allow/deny filtering.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::warn;

use crate::api::dto::rate_limit::{AccessRestricted, RateLimitExceeded};
use crate::application::services::RateDecision;
use crate::domain::category::is_static_asset;
use crate::domain::identity::AuthUser;
use crate::state::SecurityState;
use crate::utils::client_ip::client_ip;
use crate::utils::time::unix_ms_to_secs_ceil;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Allow/deny-list stage, applied before the category limiter.
///
/// Allowlisted addresses skip this stage (they still pass through the
/// category limiter behind it). Denylisted addresses are not blocked
/// outright but clamped to a few requests per minute; exhausting the clamp
/// returns `429 {error: "Access restricted"}`.
pub async fn ip_filter(
    State(state): State<SecurityState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers(), req.extensions(), state.config.behind_proxy);

    if state.config.ip_allowlist.contains(&ip) {
        return next.run(req).await;
    }

    if state.config.ip_denylist.contains(&ip) && !state.limiter.check_restricted(&ip).await {
        counter!("rate_limit_rejections_total", "category" => "restricted").increment(1);
        warn!(%ip, "Denylisted address exceeded its clamp");
        return (StatusCode::TOO_MANY_REQUESTS, Json(AccessRestricted::new())).into_response();
    }

    next.run(req).await
}

/// Category rate limiter.
///
/// # Behavior
///
/// 1. Static asset paths (`.js`, `.css`, images, fonts) bypass limiting.
/// 2. The request is classified into a category from its path and method,
///    and one slot is spent from the `category:ip:user` window.
/// 3. `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
///    headers are attached to every limited response, accepted or not.
/// 4. An exhausted window returns `429` with the category, its limit and
///    window so clients can back off precisely.
///
/// # 429 Response
///
/// ```json
/// {
///   "error": "Too many requests",
///   "message": "Financial API request limit exceeded. Wait 1 minute.",
///   "category": "financial",
///   "limit": 30,
///   "windowMs": 60000
/// }
/// ```
pub async fn layer(State(state): State<SecurityState>, req: Request, next: Next) -> Response {
    if is_static_asset(req.uri().path()) {
        return next.run(req).await;
    }

    let ip = client_ip(req.headers(), req.extensions(), state.config.behind_proxy);
    let user_id = req.extensions().get::<AuthUser>().map(|user| user.id);

    let decision = state
        .limiter
        .check(req.method(), req.uri().path(), &ip, user_id)
        .await;

    if !decision.allowed {
        counter!("rate_limit_rejections_total", "category" => decision.category.as_str()).increment(1);
        warn!(
            %ip,
            category = decision.category.as_str(),
            limit = decision.limit,
            "Rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitExceeded::from_decision(&decision)),
        )
            .into_response();
        apply_rate_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(req).await;
    apply_rate_headers(&mut response, &decision);
    response
}

fn apply_rate_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(
        RESET_HEADER,
        HeaderValue::from(unix_ms_to_secs_ceil(decision.reset_at_ms)),
    );
}
