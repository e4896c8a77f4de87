//! Middleware for the RunaMitra API
//!
//! This module provides middleware for request tracing.

mod tracing;

pub use tracing::request_tracing;
