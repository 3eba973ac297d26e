//! Utility functions for request handling and time arithmetic.
//!
//! This module provides helper functions used across the application:
//!
//! - [`client_ip`] - Client address resolution from proxy headers
//! - [`time`] - Unix-epoch millisecond helpers for rate windows

pub mod client_ip;
pub mod time;
