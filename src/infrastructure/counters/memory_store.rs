//! In-memory counter store for single-process deployments.

use super::service::{CounterResult, CounterStore, WindowState};
use crate::utils::time::unix_now_ms;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Per-process fixed-window counter store.
///
/// The whole read-reset-increment step for a key runs under a single lock
/// acquisition, so concurrent hits on the same key never lose updates.
/// Counters are not shared across processes; clustered deployments use
/// [`super::RedisCounterStore`] instead.
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, WindowState>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of tracked keys, expired or not. Exposed for diagnostics.
    pub fn tracked_keys(&self) -> usize {
        self.lock_windows().len()
    }

    fn lock_windows(&self) -> std::sync::MutexGuard<'_, HashMap<String, WindowState>> {
        // A poisoned lock only means another task panicked mid-update; the
        // map itself is still usable.
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, window_ms: u64) -> CounterResult<WindowState> {
        let now = unix_now_ms();
        let mut windows = self.lock_windows();

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            reset_at_ms: now + window_ms,
        });

        if now > state.reset_at_ms {
            state.count = 0;
            state.reset_at_ms = now + window_ms;
        }
        state.count += 1;

        Ok(*state)
    }

    async fn sweep(&self) -> usize {
        let now = unix_now_ms();
        let mut windows = self.lock_windows();
        let before = windows.len();
        windows.retain(|_, state| state.reset_at_ms >= now);
        let removed = before - windows.len();

        if removed > 0 {
            debug!("Swept {} expired rate-limit windows", removed);
        }
        removed
    }

    async fn health_check(&self) -> bool {
        true
    }
}
