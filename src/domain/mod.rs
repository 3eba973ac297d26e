//! Domain layer containing the core security data model.
//!
//! This module holds the pure building blocks of the middleware: traffic
//! classification, audit records, field redaction, and the storage trait
//! contracts. Nothing here touches HTTP, sockets, or databases.
//!
//! # Architecture
//!
//! - [`category`] - Traffic categories, limits, and route classification
//! - [`audit`] - Audit entry model, actions, and level filtering
//! - [`redaction`] - Recursive sensitive-field scrubbing
//! - [`identity`] - Authenticated-user identity read from requests
//! - [`repositories`] - Data access trait definitions
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by the infrastructure layer
//! - Everything is deterministic and unit-testable without I/O

pub mod audit;
pub mod category;
pub mod identity;
pub mod redaction;
pub mod repositories;
