//! Repository trait for durable audit storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::audit::AuditEntry;
use crate::error::AppError;

/// Repository interface for the audit database sink.
///
/// The pipeline treats this sink as best-effort: callers fall back to the
/// file sink on any error, so implementations should return errors rather
/// than retry indefinitely.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgAuditRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one entry into the `audit_logs` table.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError>;

    /// Creates the `audit_logs` table and its indexes if absent.
    ///
    /// Safe to call repeatedly; uses `IF NOT EXISTS` throughout.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn init_schema(&self) -> Result<(), AppError>;

    /// Deletes rows older than `cutoff`, returning the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
