//! # API Warden
//!
//! Security middleware for Axum APIs: category-based rate limiting, one-time
//! CSRF tokens, origin validation, IP filtering, and a buffered audit trail
//! with database and file sinks.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Traffic categories, audit records,
//!   redaction, and repository traits
//! - **Application Layer** ([`application`]) - The rate limiter, CSRF token
//!   store, and audit pipeline
//! - **Infrastructure Layer** ([`infrastructure`]) - Counter stores (memory
//!   and Redis) and audit persistence (PostgreSQL and NDJSON files)
//! - **API Layer** ([`api`]) - Middleware, handlers, and wire DTOs
//!
//! ## Design
//!
//! The stack never takes the protected application down with it: a missing
//! Redis degrades to in-process counters, a missing database degrades to the
//! file audit sink, and a failing counter backend fails open. Only the
//! policies themselves (rate limits, CSRF, origin, IP rules) reject requests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use api_warden::api::routes::apply_security;
//! use api_warden::config::SecurityConfig;
//! use api_warden::state::{SecurityOptions, SecurityState};
//!
//! # async fn demo() {
//! let app: Router = Router::new().route("/api/orders", get(|| async { "[]" }));
//!
//! let state = SecurityState::build(
//!     SecurityConfig::from_env(),
//!     SecurityOptions::default(),
//!     None,
//! )
//! .await;
//!
//! let protected = apply_security(app, state);
//! # let _ = protected;
//! # }
//! ```
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables via
//! [`config::SecurityConfig`]. See the [`config`] module for available
//! options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub use error::AppError;
pub use state::{SecurityOptions, SecurityState};

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::api::routes::{apply_security, security_routes};
    pub use crate::application::services::{AuditLogger, CsrfService, RateLimiter};
    pub use crate::config::SecurityConfig;
    pub use crate::domain::audit::{AuditAction, AuditDraft, AuditLevel};
    pub use crate::domain::category::RateCategory;
    pub use crate::error::AppError;
    pub use crate::state::{EntitySnapshotFn, SecurityOptions, SecurityState};
}
