//! Category-based rate limiting over a pluggable counter store.

use axum::http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::domain::category::{CategoryLimit, RateCategory, classify, default_limits};
use crate::infrastructure::counters::CounterStore;
use crate::utils::time::unix_now_ms;

/// Window applied to denylisted IPs regardless of the requested path.
const RESTRICTED_WINDOW_MS: u64 = 60_000;
const RESTRICTED_MAX: u64 = 5;

/// Outcome of spending one slot from a request's rate window.
///
/// Carries everything the HTTP layer needs: the verdict, the header values
/// and the category message for the rejection body.
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub category: RateCategory,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at_ms: u64,
    pub window_ms: u64,
    pub message: &'static str,
}

/// Service that classifies requests and enforces per-category windows.
///
/// Counter state lives behind [`CounterStore`], so a single instance works
/// unchanged against the in-memory store or shared Redis counters. A store
/// failure never rejects a request: the check degrades to allowing traffic
/// with a full window advertised.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limits: HashMap<RateCategory, CategoryLimit>,
}

impl RateLimiter {
    /// Creates a limiter with the built-in category limits.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_limits(store, default_limits())
    }

    /// Creates a limiter with custom limits. Categories missing from `limits`
    /// fall back to the built-in table.
    pub fn with_limits(
        store: Arc<dyn CounterStore>,
        limits: HashMap<RateCategory, CategoryLimit>,
    ) -> Self {
        let mut merged = default_limits();
        merged.extend(limits);
        Self {
            store,
            limits: merged,
        }
    }

    /// Limit table entry for a category.
    pub fn limit_for(&self, category: RateCategory) -> CategoryLimit {
        self.limits[&category]
    }

    /// Classifies the request, spends one slot from its window and returns
    /// the verdict with header values.
    ///
    /// The window key combines category, client IP and user id, so an
    /// authenticated user gets a window separate from anonymous traffic on
    /// the same address.
    pub async fn check(
        &self,
        method: &Method,
        path: &str,
        ip: &str,
        user_id: Option<i64>,
    ) -> RateDecision {
        let category = classify(path, method);
        let limit = self.limit_for(category);

        let user = match user_id {
            Some(id) => id.to_string(),
            None => "anonymous".to_string(),
        };
        let key = format!("{}:{}:{}", category.as_str(), ip, user);

        match self.store.hit(&key, limit.window_ms).await {
            Ok(window) => RateDecision {
                allowed: window.count <= limit.max,
                category,
                limit: limit.max,
                remaining: limit.max.saturating_sub(window.count),
                reset_at_ms: window.reset_at_ms,
                window_ms: limit.window_ms,
                message: limit.message,
            },
            Err(e) => {
                warn!(error = %e, %key, "Counter store unavailable, allowing request");
                RateDecision {
                    allowed: true,
                    category,
                    limit: limit.max,
                    remaining: limit.max,
                    reset_at_ms: unix_now_ms() + limit.window_ms,
                    window_ms: limit.window_ms,
                    message: limit.message,
                }
            }
        }
    }

    /// Clamp for denylisted IPs: a few requests per minute across all paths.
    /// Returns `false` when the clamp is exhausted.
    pub async fn check_restricted(&self, ip: &str) -> bool {
        let key = format!("restricted:{ip}");

        match self.store.hit(&key, RESTRICTED_WINDOW_MS).await {
            Ok(window) => window.count <= RESTRICTED_MAX,
            Err(e) => {
                warn!(error = %e, %key, "Counter store unavailable, allowing restricted IP");
                true
            }
        }
    }
}
