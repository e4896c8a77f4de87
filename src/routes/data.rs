//! Export and import route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/export", axum::routing::get(export_data))
        .route("/api/import", axum::routing::post(import_data))
}
