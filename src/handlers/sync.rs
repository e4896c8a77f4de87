//! Sync-related API handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::store::SyncStatus;
use crate::sync::SyncTrigger;

/// Connectivity report from the host shell
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub is_online: bool,
}

/// Report the current sync posture
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<Json<SyncStatus>> {
    let status = state.store.get_sync_status().await?;
    Ok(Json(status))
}

/// Explicit sync request
///
/// Fire-and-forget: the response says whether a cycle is now pending,
/// not whether it succeeded. Results arrive on the event stream.
pub async fn trigger_sync(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let requested = state.store.request_sync(SyncTrigger::Manual);
    Ok(Json(json!({ "requested": requested })))
}

/// Record the connectivity state reported by the host shell
pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(report): Json<ConnectivityReport>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.set_connectivity(report.is_online);
    Ok(Json(json!({ "isOnline": report.is_online })))
}
