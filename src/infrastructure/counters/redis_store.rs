//! Redis-backed counter store for clustered deployments.

use super::memory_store::MemoryCounterStore;
use super::service::{CounterError, CounterResult, CounterStore, WindowState};
use crate::utils::time::unix_now_ms;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Shared counter store backed by Redis.
///
/// Each hit is a single pipelined `INCR` + `PTTL` round trip; Redis
/// serializes increments per key, so counts are consistent across all
/// processes pointing at the same instance.
///
/// Degradation: any per-call Redis error flips an internal readiness flag
/// and serves the hit from an embedded [`MemoryCounterStore`] instead, so
/// the limiter never sees an error and never rejects a request over
/// bookkeeping trouble. Readiness is restored on the next successful call;
/// the outage and the recovery are each logged once.
pub struct RedisCounterStore {
    client: ConnectionManager,
    fallback: MemoryCounterStore,
    ready: AtomicBool,
    key_prefix: String,
}

impl RedisCounterStore {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::ConnectionError`] if the URL is invalid, the
    /// connection cannot be established, or the PING probe fails. Callers
    /// fall back to [`MemoryCounterStore`] in that case.
    pub async fn connect(redis_url: &str) -> CounterResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            CounterError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CounterError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CounterError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis (shared rate-limit counters)");

        Ok(Self {
            client: manager,
            fallback: MemoryCounterStore::new(),
            ready: AtomicBool::new(true),
            key_prefix: "rl:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn hit_shared(&self, key: &str, window_ms: u64) -> Result<WindowState, redis::RedisError> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&full_key)
            .cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;

        // PTTL < 0 means the key carries no expiry yet: this hit opened the
        // window (or a concurrent opener lost the PEXPIRE race, which lands
        // on the same boundary).
        let remaining_ms = if ttl_ms < 0 {
            let _: i64 = redis::cmd("PEXPIRE")
                .arg(&full_key)
                .arg(window_ms)
                .query_async(&mut conn)
                .await?;
            window_ms
        } else {
            ttl_ms as u64
        };

        Ok(WindowState {
            count,
            reset_at_ms: unix_now_ms() + remaining_ms,
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(&self, key: &str, window_ms: u64) -> CounterResult<WindowState> {
        match self.hit_shared(key, window_ms).await {
            Ok(state) => {
                if !self.ready.swap(true, Ordering::Relaxed) {
                    info!("Redis counter store recovered, resuming shared counters");
                }
                Ok(state)
            }
            Err(e) => {
                if self.ready.swap(false, Ordering::Relaxed) {
                    warn!(
                        "Redis counter store degraded, falling back to in-memory counters: {}",
                        e
                    );
                }
                self.fallback.hit(key, window_ms).await
            }
        }
    }

    async fn sweep(&self) -> usize {
        // Redis expires its own keys; only the fallback map accumulates.
        self.fallback.sweep().await
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
