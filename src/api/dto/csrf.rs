//! DTOs for CSRF token issuance.

use serde::Serialize;

use crate::application::services::IssuedToken;

/// Response for `GET /api/csrf-token`.
///
/// `expires` is the absolute expiry as Unix-epoch milliseconds; the same
/// token is also delivered in the `_csrf` cookie for the double-submit
/// check.
#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
    pub expires: u64,
}

impl CsrfTokenResponse {
    pub fn from_issued(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires: issued.expires_at_ms,
        }
    }
}
