//! API handlers for the RunaMitra record store

mod data;
mod loans;
mod notifications;
mod sync;

pub use data::*;
pub use loans::*;
pub use notifications::*;
pub use sync::*;
