//! Notification route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", axum::routing::get(list_notifications))
        .route(
            "/api/notifications/generate",
            axum::routing::post(generate_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            axum::routing::post(mark_notification_read),
        )
}
