//! Loan domain module
//!
//! Contains the loan agreement and payment record models shared by the
//! record store and the API surface.

mod model;

pub use model::*;
