//! Counter store trait and error types.

use async_trait::async_trait;

/// Errors that can occur during counter operations.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("Counter store connection error: {0}")]
    ConnectionError(String),
    #[error("Counter store operation error: {0}")]
    OperationError(String),
}

/// Result type for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// State of one fixed window after a hit has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Hits recorded in the current window, including this one.
    pub count: u64,
    /// Absolute unix-millisecond timestamp at which the window resets.
    pub reset_at_ms: u64,
}

/// Trait for fixed-window request counting.
///
/// Implementations must be thread-safe and handle errors gracefully without
/// disrupting the application: the limiter fails open, so a store that
/// cannot count must still answer rather than reject requests.
///
/// # Implementations
///
/// - [`crate::infrastructure::counters::RedisCounterStore`] - shared counters
///   for clustered deployments, with per-call in-memory fallback
/// - [`crate::infrastructure::counters::MemoryCounterStore`] - per-process
///   counters; the default when Redis is not configured
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Records one hit against `key` and returns the resulting window state.
    ///
    /// If the key's window has elapsed, the count restarts at 1 with a fresh
    /// `reset_at_ms` of now + `window_ms`. The read-reset-increment sequence
    /// is atomic per key.
    ///
    /// # Errors
    ///
    /// Production implementations should not surface errors: backend trouble
    /// degrades to local counting instead. The error channel exists for
    /// connect-time probes and diagnostics.
    async fn hit(&self, key: &str, window_ms: u64) -> CounterResult<WindowState>;

    /// Drops expired windows, returning how many were removed.
    ///
    /// Only meaningful for in-process backends; shared backends expire keys
    /// natively.
    async fn sweep(&self) -> usize;

    /// Checks if the counter backend is healthy.
    ///
    /// Used by health check endpoints to report store status.
    async fn health_check(&self) -> bool;
}
