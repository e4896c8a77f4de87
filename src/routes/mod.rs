//! Route definitions for the RunaMitra API

mod data;
mod loans;
mod notifications;
mod sync;

pub use data::data_routes;
pub use loans::loan_routes;
pub use notifications::notification_routes;
pub use sync::sync_routes;

use axum::Router;

use crate::state::AppState;

/// All API route groups merged into one router
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(loan_routes())
        .merge(notification_routes())
        .merge(sync_routes())
        .merge(data_routes())
}
