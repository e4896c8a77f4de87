//! Notification domain module
//!
//! Contains the notification model, the builders that produce due,
//! overdue and completion alerts from loan state, and the background
//! scan job.

mod model;
mod scan;

pub use model::*;
pub use scan::due_date_scanner;
