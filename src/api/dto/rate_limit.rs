//! DTOs for rate-limit rejection responses.

use serde::Serialize;

use crate::application::services::RateDecision;

/// 429 body returned when a category window is exhausted.
#[derive(Debug, Serialize)]
pub struct RateLimitExceeded {
    pub error: &'static str,
    pub message: &'static str,
    pub category: &'static str,
    pub limit: u64,
    #[serde(rename = "windowMs")]
    pub window_ms: u64,
}

impl RateLimitExceeded {
    pub fn from_decision(decision: &RateDecision) -> Self {
        Self {
            error: "Too many requests",
            message: decision.message,
            category: decision.category.as_str(),
            limit: decision.limit,
            window_ms: decision.window_ms,
        }
    }
}

/// 429 body returned to denylisted addresses that exhausted their clamp.
#[derive(Debug, Serialize)]
pub struct AccessRestricted {
    pub error: &'static str,
}

impl AccessRestricted {
    pub fn new() -> Self {
        Self {
            error: "Access restricted",
        }
    }
}

impl Default for AccessRestricted {
    fn default() -> Self {
        Self::new()
    }
}
