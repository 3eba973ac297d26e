//! Audit trail persistence.
//!
//! Two sinks with different guarantees:
//!
//! - [`PgAuditRepository`] - PostgreSQL storage for queryable history
//! - [`FileAuditLog`] - per-day NDJSON files, the always-available fallback
//!
//! The audit pipeline writes to the database when one is configured and falls
//! back to the file sink when the insert fails, so losing the database never
//! loses the trail.

pub mod file_audit_log;
pub mod pg_audit_repository;

pub use file_audit_log::FileAuditLog;
pub use pg_audit_repository::PgAuditRepository;
