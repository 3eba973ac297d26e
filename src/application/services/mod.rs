//! Business logic services for the application layer.

pub mod audit_service;
pub mod csrf_service;
pub mod rate_limit_service;

pub use audit_service::AuditLogger;
pub use csrf_service::{CsrfRejection, CsrfService, IssuedToken};
pub use rate_limit_service::{RateDecision, RateLimiter};
