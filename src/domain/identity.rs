//! Authenticated-user identity consumed from request extensions.

use serde::{Deserialize, Serialize};

/// Identity of the authenticated caller, inserted into request extensions
/// by the host application's authentication layer.
///
/// This crate only reads it: the rate limiter keys counters per user and
/// the audit pipeline attributes entries to it. Requests without an
/// `AuthUser` extension are treated as anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn new(id: i64, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            role: role.into(),
        }
    }
}
