//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::SecurityState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /api/health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Counter store**: Backend ping (always healthy for in-memory counters)
/// 2. **Database**: `SELECT 1` when an audit database is configured
/// 3. **Audit pipeline**: Reports the current buffer depth
pub async fn health_handler(
    State(state): State<SecurityState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_check = check_counter_store(&state).await;

    let db_check = check_database(&state).await;

    let audit_check = CheckStatus {
        status: "ok".to_string(),
        message: Some(format!("Buffered entries: {}", state.audit.buffered())),
    };

    let all_healthy =
        store_check.status == "ok" && db_check.status == "ok" && audit_check.status == "ok";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            counter_store: store_check,
            database: db_check,
            audit_pipeline: audit_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Checks rate-limit counter backend connectivity.
async fn check_counter_store(state: &SecurityState) -> CheckStatus {
    if state.store.health_check().await {
        CheckStatus {
            status: "ok".to_string(),
            message: Some("Counter store responding".to_string()),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("Counter store unreachable, counting locally".to_string()),
        }
    }
}

/// Checks audit database connectivity, if one is configured.
async fn check_database(state: &SecurityState) -> CheckStatus {
    match &state.db {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool.as_ref()).await {
            Ok(_) => CheckStatus {
                status: "ok".to_string(),
                message: Some("Connected".to_string()),
            },
            Err(e) => CheckStatus {
                status: "error".to_string(),
                message: Some(format!("Database error: {}", e)),
            },
        },
        None => CheckStatus {
            status: "ok".to_string(),
            message: Some("Not configured, audit trail is file-based".to_string()),
        },
    }
}
