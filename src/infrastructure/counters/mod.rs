//! Fixed-window counter stores for the rate limiter.
//!
//! Provides a [`CounterStore`] trait with two implementations:
//! - [`RedisCounterStore`] - shared counters for clustered deployments
//! - [`MemoryCounterStore`] - per-process counters (default/fallback)
//!
//! [`connect_store`] performs the startup selection: probe Redis when it is
//! configured, fall back to memory otherwise. Nothing outside this module
//! branches on the backend.

mod memory_store;
mod redis_store;
mod service;

pub use memory_store::MemoryCounterStore;
pub use redis_store::RedisCounterStore;
pub use service::{CounterError, CounterResult, CounterStore, WindowState};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cadence of the expired-window sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Selects the counter backend at startup.
///
/// Never fails: a configured-but-unreachable Redis degrades to in-memory
/// counting with a warning, matching the limiter's fail-open contract.
pub async fn connect_store(redis_url: Option<&str>) -> Arc<dyn CounterStore> {
    if let Some(url) = redis_url {
        match RedisCounterStore::connect(url).await {
            Ok(store) => {
                info!("Rate-limit counters: shared (Redis)");
                return Arc::new(store);
            }
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Using in-memory counters.",
                    e
                );
            }
        }
    } else {
        info!("Rate-limit counters: in-memory (per-process)");
    }

    Arc::new(MemoryCounterStore::new())
}

/// Starts the periodic sweep of abandoned rate windows. Runs until the
/// process exits.
///
/// Redis expires its keys natively, so the sweep there only prunes the
/// embedded fallback store.
pub fn spawn_sweeper(store: Arc<dyn CounterStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.sweep().await;
            if removed > 0 {
                debug!(removed, "Swept expired rate-limit windows");
            }
        }
    })
}
