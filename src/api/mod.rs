//! HTTP layer: the middleware stack and the facade's own endpoints.
//!
//! This layer turns policy decisions from the application services into
//! wire behavior: rejection bodies, rate-limit headers, cookies.
//!
//! # Modules
//!
//! - [`dto`] - Wire-format bodies for rejections and facade endpoints
//! - [`handlers`] - CSRF token issuance and health
//! - [`middleware`] - The filtering, limiting, CSRF, and audit stages
//! - [`routes`] - Facade assembly: route registration and stage ordering

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
