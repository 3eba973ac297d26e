//! Data Transfer Objects for API responses.
//!
//! All DTOs use Serde for JSON serialization. Field names follow the wire
//! contract of the middleware layer (camelCase where clients expect it).

pub mod csrf;
pub mod health;
pub mod rate_limit;
pub mod security;
