//! HTTP middleware for request protection and observability.
//!
//! The protection stack, outermost first: IP filtering, category rate
//! limiting, origin validation, the CSRF guard, then audit observation
//! around the business handler.

pub mod audit;
pub mod csrf;
pub mod rate_limit;
pub mod tracing;
