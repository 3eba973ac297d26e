//! Handler for CSRF token issuance.

use axum::{
    Json,
    extract::{Request, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
};

use crate::api::dto::csrf::CsrfTokenResponse;
use crate::domain::identity::AuthUser;
use crate::state::SecurityState;
use crate::utils::client_ip::client_ip;

/// Issues a one-time CSRF token.
///
/// # Endpoint
///
/// `GET /api/csrf-token`
///
/// # Response
///
/// `200 OK` with `{token, expires}` and a `_csrf` cookie carrying the same
/// token for the double-submit check. The cookie is `SameSite=Strict`,
/// `Secure` in production, and readable by scripts so SPA clients can echo
/// it into the `x-csrf-token` header.
///
/// ```json
/// {
///   "token": "9f8a...64 hex chars...",
///   "expires": 1735689600000
/// }
/// ```
pub async fn csrf_token_handler(
    State(state): State<SecurityState>,
    req: Request,
) -> impl IntoResponse {
    let ip = client_ip(req.headers(), req.extensions(), state.config.behind_proxy);
    let user_id = req.extensions().get::<AuthUser>().map(|user| user.id);

    let issued = state.csrf.issue(user_id, Some(&ip));

    let secure = if state.config.production {
        "; Secure"
    } else {
        ""
    };
    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; SameSite=Strict{}",
        state.config.csrf_cookie_name,
        issued.token,
        state.csrf.ttl_ms() / 1000,
        secure,
    );

    (
        [(SET_COOKIE, cookie)],
        Json(CsrfTokenResponse::from_issued(issued)),
    )
}
