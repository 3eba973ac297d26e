//! PostgreSQL implementation of the audit trail repository.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

use crate::domain::audit::AuditEntry;
use crate::domain::repositories::AuditRepository;
use crate::error::{AppError, map_sqlx_error};

/// Delay between insert attempts when the database rejects a write.
const RETRY_DELAY_MS: u64 = 200;

/// How many times a failed insert is retried before giving up.
const RETRY_ATTEMPTS: usize = 1;

/// PostgreSQL repository for the `audit_logs` table.
///
/// The table is created on demand via [`AuditRepository::init_schema`], so the
/// queries here bind at runtime instead of relying on compile-time schema
/// verification. Inserts are retried once on failure; callers decide what to
/// do when the retry also fails (the audit pipeline falls back to file-only
/// persistence).
pub struct PgAuditRepository {
    pool: Arc<PgPool>,
}

impl PgAuditRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn insert_once(&self, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
        INSERT INTO audit_logs (
            id, timestamp, action, entity, entity_id,
            user_id, user_email, user_role,
            ip, method, path, request_body,
            previous_data, new_data,
            status, error_message, duration_ms, metadata
        )
        VALUES (
            $1, $2, $3, $4, $5,
            $6, $7, $8,
            $9, $10, $11, $12,
            $13, $14,
            $15, $16, $17, $18
        )
        "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(entry.action.as_str())
        .bind(&entry.entity)
        .bind(entry.entity_id.as_deref())
        .bind(entry.user.id)
        .bind(entry.user.email.as_deref())
        .bind(entry.user.role.as_deref())
        .bind(&entry.request.ip)
        .bind(&entry.request.method)
        .bind(&entry.request.path)
        .bind(json_or_none(&entry.request.body))
        .bind(json_or_none(&entry.changes.previous))
        .bind(json_or_none(&entry.changes.new_data))
        .bind(entry.result.status.as_str())
        .bind(entry.result.error.as_deref())
        .bind(entry.result.duration_ms)
        .bind(json_or_none(&entry.metadata))
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

/// Maps a JSON `null` to a SQL `NULL` so empty payloads do not clutter the
/// JSONB columns with literal `null` values.
fn json_or_none(value: &Value) -> Option<&Value> {
    if value.is_null() { None } else { Some(value) }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError> {
        let strategy = FixedInterval::from_millis(RETRY_DELAY_MS).take(RETRY_ATTEMPTS);

        Retry::spawn(strategy, || self.insert_once(entry))
            .await
            .map_err(map_sqlx_error)
    }

    async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id UUID PRIMARY KEY,
            timestamp TIMESTAMPTZ NOT NULL,
            action TEXT NOT NULL,
            entity TEXT NOT NULL,
            entity_id TEXT,
            user_id BIGINT,
            user_email TEXT,
            user_role TEXT,
            ip VARCHAR(45),
            method VARCHAR(10),
            path TEXT,
            request_body JSONB,
            previous_data JSONB,
            new_data JSONB,
            status TEXT NOT NULL DEFAULT 'success',
            error_message TEXT,
            duration_ms BIGINT,
            metadata JSONB
        )
        "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs (timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_action ON audit_logs (action)",
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs (entity, entity_id)",
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_user ON audit_logs (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_audit_logs_status ON audit_logs (status)",
        ];

        for statement in indexes {
            sqlx::query(statement)
                .execute(self.pool.as_ref())
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn prune_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE timestamp < $1")
            .bind(cutoff)
            .execute(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
