//! Notification-related API handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiResult;
use crate::notification::Notification;
use crate::state::AppState;

/// List all notifications
pub async fn list_notifications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = state.store.get_notifications().await?;
    Ok(Json(notifications))
}

/// Run the due-date scan now, returning newly created alerts
pub async fn generate_notifications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Notification>>> {
    let created = state.store.generate_payment_notifications().await?;
    Ok(Json(created))
}

/// Mark a single notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let notification = state.store.mark_notification_read(&id).await?;
    Ok(Json(notification))
}
