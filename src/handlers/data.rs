//! Export and import API handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::ImportSummary;

/// Export both collections as a pretty-printed JSON document
pub async fn export_data(State(state): State<AppState>) -> ApiResult<Response> {
    let document = state.store.export_data().await?;
    let body = serde_json::to_string_pretty(&document)
        .map_err(|e| ApiError::InternalError(format!("Failed to encode export: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"runamitra-backup.json\"",
            ),
        ],
        body,
    )
        .into_response())
}

/// Import a document, replacing local state wholesale
///
/// The body is the raw exported file; shape validation happens before
/// anything is written.
pub async fn import_data(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<ImportSummary>> {
    let summary = state.store.import_data(&body).await?;
    Ok(Json(summary))
}
