//! Shared DTO for policy rejections.

use serde::Serialize;

/// 403 body for requests stopped by the CSRF guard or origin validation.
///
/// `error` is a stable label clients can switch on; `message` explains how
/// to proceed.
#[derive(Debug, Serialize)]
pub struct PolicyRejected {
    pub error: &'static str,
    pub message: &'static str,
}

impl PolicyRejected {
    pub fn new(error: &'static str, message: &'static str) -> Self {
        Self { error, message }
    }
}
