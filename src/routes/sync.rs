//! Sync route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync", axum::routing::post(trigger_sync))
        .route("/api/sync/status", axum::routing::get(sync_status))
        .route(
            "/api/sync/connectivity",
            axum::routing::put(set_connectivity),
        )
}
