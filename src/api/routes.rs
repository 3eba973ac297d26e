//! Security facade: route registration and middleware assembly.
//!
//! [`apply_security`] wires the whole stack onto a host application's router
//! in a fixed order. Requests traverse, outermost first:
//!
//! 1. IP allow/deny filter
//! 2. Category rate limiter
//! 3. Origin validation (only when an origin allow-list is configured)
//! 4. CSRF guard (the token-issuance route is registered alongside)
//! 5. Audit observers (deletes by default, all writes opt-in)
//!
//! Every stage can be disabled through [`crate::state::SecurityOptions`];
//! background tasks (CSRF sweep, audit flush, counter-window sweep, audit
//! schema initialization) are spawned here as well, and a schema
//! initialization failure is logged, never fatal.

use axum::{Router, middleware, routing::get};
use tracing::{error, info};

use crate::api::handlers::{csrf_token_handler, health_handler};
use crate::api::middleware::{audit, csrf, rate_limit};
use crate::application::services::audit_service::FLUSH_INTERVAL;
use crate::application::services::csrf_service::SWEEP_INTERVAL;
use crate::domain::repositories::AuditRepository;
use crate::infrastructure::counters;
use crate::infrastructure::persistence::PgAuditRepository;
use crate::state::SecurityState;

/// Routes the security layer installs on the host application.
///
/// # Endpoints
///
/// - `GET /api/csrf-token` - One-time token issuance with `_csrf` cookie
/// - `GET /api/health`     - Component health (counter store, database, audit)
pub fn security_routes() -> Router<SecurityState> {
    Router::new()
        .route("/api/csrf-token", get(csrf_token_handler))
        .route("/api/health", get(health_handler))
}

/// Mounts the security stack around `app`.
///
/// Layers are added innermost-first so the documented traversal order
/// holds; the audit observers sit closest to the handlers and see the
/// response the client actually receives.
pub fn apply_security(app: Router, state: SecurityState) -> Router {
    let options = state.options.clone();

    let mut app = app.merge(security_routes().with_state(state.clone()));

    if options.audit_writes {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            audit::write_audit,
        ));
    }
    if options.audit_deletes {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            audit::delete_audit,
        ));
    }
    if options.csrf {
        app = app.layer(middleware::from_fn_with_state(state.clone(), csrf::guard));
    }
    if options.origin_validation && !state.config.allowed_origins.is_empty() {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            csrf::origin_validation,
        ));
    }
    if options.rate_limit {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::layer,
        ));
    }
    if options.ip_filter {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::ip_filter,
        ));
    }

    if options.spawn_background_tasks {
        spawn_background_tasks(&state);
    }

    app
}

/// Starts the periodic CSRF sweep, audit flush and counter-window sweep,
/// and initializes the audit table when a database is configured.
fn spawn_background_tasks(state: &SecurityState) {
    state.csrf.clone().spawn_sweeper(SWEEP_INTERVAL);
    state.audit.clone().spawn_flusher(FLUSH_INTERVAL);
    counters::spawn_sweeper(state.store.clone(), counters::SWEEP_INTERVAL);

    if let Some(pool) = &state.db {
        let repository = PgAuditRepository::new(pool.clone());
        tokio::spawn(async move {
            match repository.init_schema().await {
                Ok(()) => info!("Audit table ready"),
                Err(e) => {
                    error!(error = %e, "Audit table initialization failed, file sink remains available");
                }
            }
        });
    }
}
