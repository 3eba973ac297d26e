//! Clock helpers for window arithmetic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds.
///
/// Returns 0 if the system clock reports a time before the unix epoch,
/// which only happens on a badly misconfigured host.
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts an absolute millisecond timestamp to unix seconds, rounding up.
///
/// Used for the `X-RateLimit-Reset` header so the advertised reset time is
/// never earlier than the actual window boundary.
pub fn unix_ms_to_secs_ceil(ms: u64) -> u64 {
    ms.div_ceil(1000)
}
