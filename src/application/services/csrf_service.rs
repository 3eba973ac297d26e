//! One-time CSRF token lifecycle: issue, validate-and-consume, sweep.

use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::utils::time::unix_now_ms;

/// Default token lifetime: one hour.
pub const DEFAULT_TOKEN_TTL_MS: u64 = 60 * 60 * 1000;

/// How often expired tokens are swept out of the store.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Why a presented token was rejected.
///
/// `Missing` and `Mismatch` are produced by the HTTP guard (no token supplied,
/// or cookie and header disagree); `Invalid` and `Expired` come from the store
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfRejection {
    Missing,
    Invalid,
    Expired,
    Mismatch,
}

impl CsrfRejection {
    /// Stable machine-readable label, used as the `error` field of the 403
    /// body.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "CSRF token missing",
            Self::Invalid => "CSRF token invalid",
            Self::Expired => "CSRF token expired",
            Self::Mismatch => "CSRF token mismatch",
        }
    }

    /// Short form used as the `reason` metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::Mismatch => "mismatch",
        }
    }

    /// Human-oriented explanation, used as the `message` field of the 403
    /// body.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Missing => {
                "Request a token from GET /api/csrf-token and send it in the x-csrf-token header"
            }
            Self::Invalid => "The token was already used or never issued; request a new one",
            Self::Expired => "The token has expired; request a new one",
            Self::Mismatch => "The submitted token does not match the _csrf cookie",
        }
    }
}

/// A freshly issued token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at_ms: u64,
}

struct TokenEntry {
    expires_at_ms: u64,
    // Kept for diagnostics; validation deliberately does not compare these
    // against the presenting request.
    #[allow(dead_code)]
    user_id: Option<i64>,
    #[allow(dead_code)]
    ip: Option<String>,
}

/// In-process store of one-time CSRF tokens.
///
/// Every token is valid for exactly one state-changing request: validation
/// and deletion happen under the same lock acquisition, so two concurrent
/// requests presenting the same token cannot both pass. Expired entries are
/// evicted on presentation and by the periodic sweep.
pub struct CsrfService {
    tokens: Mutex<HashMap<String, TokenEntry>>,
    ttl_ms: u64,
}

impl CsrfService {
    /// Creates a store issuing tokens that live for `ttl_ms` milliseconds.
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    /// Token lifetime in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    fn lock_tokens(&self) -> MutexGuard<'_, HashMap<String, TokenEntry>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issues a fresh 32-byte random token, optionally recording which user
    /// and address it was handed to.
    pub fn issue(&self, user_id: Option<i64>, ip: Option<&str>) -> IssuedToken {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let expires_at_ms = unix_now_ms() + self.ttl_ms;
        self.lock_tokens().insert(
            token.clone(),
            TokenEntry {
                expires_at_ms,
                user_id,
                ip: ip.map(str::to_owned),
            },
        );

        IssuedToken {
            token,
            expires_at_ms,
        }
    }

    /// Validates `token` and consumes it on success.
    ///
    /// Unknown tokens are rejected as [`CsrfRejection::Invalid`]; known but
    /// expired tokens are evicted and rejected as [`CsrfRejection::Expired`].
    /// Both the check and the deletion happen under one lock acquisition.
    pub fn validate_and_consume(&self, token: &str) -> Result<(), CsrfRejection> {
        let mut tokens = self.lock_tokens();

        let Some(entry) = tokens.get(token) else {
            return Err(CsrfRejection::Invalid);
        };

        if unix_now_ms() > entry.expires_at_ms {
            tokens.remove(token);
            return Err(CsrfRejection::Expired);
        }

        tokens.remove(token);
        Ok(())
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = unix_now_ms();
        let mut tokens = self.lock_tokens();
        let before = tokens.len();
        tokens.retain(|_, entry| entry.expires_at_ms >= now);
        before - tokens.len()
    }

    /// Number of live (unconsumed, possibly expired) tokens.
    pub fn active_tokens(&self) -> usize {
        self.lock_tokens().len()
    }

    /// Spawns the periodic sweep task. Runs until the process exits.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the sweep
            // starts one full interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    debug!(removed, "Swept expired CSRF tokens");
                }
            }
        })
    }

    #[cfg(test)]
    fn insert_with_expiry(&self, token: &str, expires_at_ms: u64) {
        self.lock_tokens().insert(
            token.to_string(),
            TokenEntry {
                expires_at_ms,
                user_id: None,
                ip: None,
            },
        );
    }
}

impl Default for CsrfService {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_is_64_hex_chars() {
        let service = CsrfService::default();
        let issued = service.issue(None, None);

        assert_eq!(issued.token.len(), 64);
        assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(issued.expires_at_ms > unix_now_ms());
    }

    #[test]
    fn test_tokens_are_unique() {
        let service = CsrfService::default();
        assert_ne!(service.issue(None, None).token, service.issue(None, None).token);
    }

    #[test]
    fn test_token_is_consumed_on_first_use() {
        let service = CsrfService::default();
        let issued = service.issue(Some(7), Some("10.0.0.1"));

        assert_eq!(service.validate_and_consume(&issued.token), Ok(()));
        assert_eq!(
            service.validate_and_consume(&issued.token),
            Err(CsrfRejection::Invalid)
        );
    }

    #[test]
    fn test_unknown_token_is_invalid() {
        let service = CsrfService::default();
        assert_eq!(
            service.validate_and_consume("deadbeef"),
            Err(CsrfRejection::Invalid)
        );
    }

    #[test]
    fn test_expired_token_is_rejected_and_evicted() {
        let service = CsrfService::default();
        service.insert_with_expiry("stale", unix_now_ms() - 1);

        assert_eq!(
            service.validate_and_consume("stale"),
            Err(CsrfRejection::Expired)
        );
        // The eviction means a replay no longer reports "expired".
        assert_eq!(
            service.validate_and_consume("stale"),
            Err(CsrfRejection::Invalid)
        );
    }

    #[test]
    fn test_sweep_drops_only_expired_entries() {
        let service = CsrfService::default();
        service.insert_with_expiry("old-1", unix_now_ms() - 10);
        service.insert_with_expiry("old-2", unix_now_ms() - 10);
        let live = service.issue(None, None);

        assert_eq!(service.sweep(), 2);
        assert_eq!(service.active_tokens(), 1);
        assert_eq!(service.validate_and_consume(&live.token), Ok(()));
    }

    #[test]
    fn test_concurrent_presentations_accept_exactly_one() {
        let service = Arc::new(CsrfService::default());
        let issued = service.issue(None, None);

        let mut accepted = 0;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let service = Arc::clone(&service);
                    let token = issued.token.clone();
                    scope.spawn(move || service.validate_and_consume(&token).is_ok())
                })
                .collect();

            for handle in handles {
                if handle.join().unwrap() {
                    accepted += 1;
                }
            }
        });

        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_rejection_labels_match_the_wire_contract() {
        assert_eq!(CsrfRejection::Missing.label(), "CSRF token missing");
        assert_eq!(CsrfRejection::Invalid.label(), "CSRF token invalid");
        assert_eq!(CsrfRejection::Expired.label(), "CSRF token expired");
        assert_eq!(CsrfRejection::Mismatch.label(), "CSRF token mismatch");
    }
}
