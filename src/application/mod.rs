//! Application layer services implementing the security policies.
//!
//! This layer holds the policy state machines behind the HTTP middleware:
//! rate windows, token lifecycle and the audit pipeline. Services consume
//! domain types and infrastructure traits and expose a narrow API for the
//! middleware layer.
//!
//! # Available Services
//!
//! - [`services::rate_limit_service::RateLimiter`] - Per-category request windows
//! - [`services::csrf_service::CsrfService`] - One-time CSRF token store
//! - [`services::audit_service::AuditLogger`] - Buffered audit trail pipeline

pub mod services;
