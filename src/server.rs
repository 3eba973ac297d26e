//! HTTP server initialization and runtime setup for the standalone binary.
//!
//! Handles the optional database connection, security state assembly, and
//! the Axum server lifecycle. Library consumers skip this module and mount
//! the stack on their own router with
//! [`apply_security`](crate::api::routes::apply_security).

use crate::api::middleware::tracing as request_tracing;
use crate::api::routes::apply_security;
use crate::config::SecurityConfig;
use crate::state::{SecurityOptions, SecurityState};

use anyhow::Result;
use axum::extract::Request;
use axum::{Router, ServiceExt, middleware};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool (optional; audit degrades to file-only)
/// - The security state: counter store, rate limiter, CSRF store, audit pipeline
/// - The full middleware stack and its background tasks
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if the server fails to bind or crashes at runtime.
/// Missing backends are not errors; the stack runs degraded instead.
pub async fn run(config: SecurityConfig) -> Result<()> {
    let pool = connect_database(&config).await;

    let state = SecurityState::build(config, SecurityOptions::default(), pool).await;
    let listen_addr = state.config.listen_addr.clone();

    let app = apply_security(Router::new(), state)
        .layer(middleware::from_fn(request_tracing::track_metrics))
        .layer(request_tracing::layer());
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let addr: SocketAddr = listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .await?;

    Ok(())
}

/// Connects to PostgreSQL when `DATABASE_URL` is configured.
///
/// Connection failure is downgraded to a warning: the audit pipeline keeps
/// every entry in the file sink, and the rest of the stack is unaffected.
async fn connect_database(config: &SecurityConfig) -> Option<PgPool> {
    let url = config.database_url.as_ref()?;

    match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connected to database");
            Some(pool)
        }
        Err(e) => {
            tracing::warn!(
                "Database unavailable ({}), audit trail is file-only",
                e
            );
            None
        }
    }
}
