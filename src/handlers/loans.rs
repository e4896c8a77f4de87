//! Loan-related API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::loan::{LoanAgreement, RecordPaymentRequest, UpsertLoansRequest};
use crate::state::AppState;

/// List all loans
pub async fn list_loans(State(state): State<AppState>) -> ApiResult<Json<Vec<LoanAgreement>>> {
    let loans = state.store.get_loans().await?;
    Ok(Json(loans))
}

/// Get a single loan by id
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LoanAgreement>> {
    let loan = state
        .store
        .get_loan_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Loan {}", id)))?;
    Ok(Json(loan))
}

/// Upsert a batch of loans, returning the saved records
pub async fn upsert_loans(
    State(state): State<AppState>,
    Json(request): Json<UpsertLoansRequest>,
) -> ApiResult<Json<Vec<LoanAgreement>>> {
    for loan in &request.loans {
        loan.validate()?;
    }

    let saved = state.store.upsert_loans(request.loans).await?;
    Ok(Json(saved))
}

/// Delete a loan; a missing id is a no-op
pub async fn delete_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.store.delete_loan(&id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Record a payment against an existing loan
pub async fn record_payment(
    State(state): State<AppState>,
    Json(request): Json<RecordPaymentRequest>,
) -> ApiResult<Json<LoanAgreement>> {
    request.validate()?;

    let loan = state.store.record_payment(request).await?;
    Ok(Json(loan))
}
