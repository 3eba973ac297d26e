//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for rate-limit counters and audit persistence.
//!
//! # Modules
//!
//! - [`counters`] - Rate-limit counter stores (in-memory and Redis-backed)
//! - [`persistence`] - Audit trail sinks (PostgreSQL and NDJSON files)

pub mod counters;
pub mod persistence;
