//! Shared state for the security middleware stack.

use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::services::{AuditLogger, CsrfService, RateLimiter};
use crate::config::SecurityConfig;
use crate::domain::category::{CategoryLimit, RateCategory};
use crate::domain::repositories::AuditRepository;
use crate::infrastructure::counters::{CounterStore, connect_store};
use crate::infrastructure::persistence::{FileAuditLog, PgAuditRepository};

/// Paths the facade always exempts from the CSRF guard, on top of the
/// configured ignore list: OAuth callbacks arrive from third parties that
/// hold no token, and SSE/event streams must not have their bodies peeked.
const FACADE_CSRF_EXEMPT: [&str; 3] = ["/api/callback", "/api/sse", "/api/events"];

/// Future returned by an entity snapshot accessor.
pub type SnapshotFuture = Pin<Box<dyn Future<Output = Option<Value>> + Send>>;

/// Caller-supplied accessor that fetches an entity's current state by
/// `(entity, id)`. The delete-audit middleware invokes it before the handler
/// runs so the entry can record what was deleted.
pub type EntitySnapshotFn = Arc<dyn Fn(&str, &str) -> SnapshotFuture + Send + Sync>;

/// Per-stage toggles for the security facade.
///
/// Every stage defaults to on except write auditing, which host applications
/// usually mount on specific routers rather than globally.
#[derive(Clone)]
pub struct SecurityOptions {
    pub ip_filter: bool,
    pub rate_limit: bool,
    pub origin_validation: bool,
    pub csrf: bool,
    pub audit_deletes: bool,
    pub audit_writes: bool,
    /// Spawn the CSRF sweep, audit flush and counter sweep tasks and
    /// initialize the audit schema. Turned off in tests that drive flushing
    /// explicitly.
    pub spawn_background_tasks: bool,
    /// Per-category limit overrides; categories absent here keep their
    /// defaults.
    pub rate_limits: HashMap<RateCategory, CategoryLimit>,
    pub entity_snapshot: Option<EntitySnapshotFn>,
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            ip_filter: true,
            rate_limit: true,
            origin_validation: true,
            csrf: true,
            audit_deletes: true,
            audit_writes: false,
            spawn_background_tasks: true,
            rate_limits: HashMap::new(),
            entity_snapshot: None,
        }
    }
}

/// Everything the middleware stack shares: configuration, the counter
/// store, and the three policy services.
#[derive(Clone)]
pub struct SecurityState {
    pub config: Arc<SecurityConfig>,
    pub options: Arc<SecurityOptions>,
    pub store: Arc<dyn CounterStore>,
    pub limiter: Arc<RateLimiter>,
    pub csrf: Arc<CsrfService>,
    pub audit: Arc<AuditLogger>,
    pub db: Option<Arc<PgPool>>,
}

impl SecurityState {
    /// Assembles the stack: counter store selection (Redis when configured,
    /// in-memory otherwise), the rate limiter over it, the CSRF token store
    /// and the audit pipeline (database-backed when `pool` is given, file
    /// only otherwise).
    ///
    /// Never fails: every backend has a local fallback.
    pub async fn build(
        mut config: SecurityConfig,
        options: SecurityOptions,
        pool: Option<PgPool>,
    ) -> Self {
        for path in FACADE_CSRF_EXEMPT {
            if !config.csrf_ignore_paths.iter().any(|p| p == path) {
                config.csrf_ignore_paths.push(path.to_string());
            }
        }

        let store = connect_store(config.redis_url.as_deref()).await;
        let limiter = Arc::new(RateLimiter::with_limits(
            store.clone(),
            options.rate_limits.clone(),
        ));
        let csrf = Arc::new(CsrfService::new(config.csrf_token_ttl_secs * 1000));

        let db = pool.map(Arc::new);
        let repository = db
            .clone()
            .map(|pool| Arc::new(PgAuditRepository::new(pool)) as Arc<dyn AuditRepository>);
        let audit = Arc::new(AuditLogger::new(
            config.audit_level,
            FileAuditLog::new(config.audit_log_dir.clone()),
            repository,
            config.audit_retention_days,
        ));

        Self {
            config: Arc::new(config),
            options: Arc::new(options),
            store,
            limiter,
            csrf,
            audit,
            db,
        }
    }
}
