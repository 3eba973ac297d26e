//! HTTP request handlers for the endpoints the security layer installs.

pub mod csrf_token;
pub mod health;

pub use csrf_token::csrf_token_handler;
pub use health::health_handler;
