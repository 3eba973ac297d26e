//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for durable storage; concrete implementations
//! live in `crate::infrastructure::persistence`. Mock implementations are
//! auto-generated via `mockall` for testing.

pub mod audit_repository;

pub use audit_repository::AuditRepository;

#[cfg(test)]
pub use audit_repository::MockAuditRepository;
