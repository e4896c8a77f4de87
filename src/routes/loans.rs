//! Loan route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", axum::routing::get(list_loans))
        .route("/api/loans", axum::routing::post(upsert_loans))
        .route("/api/loans/:id", axum::routing::get(get_loan))
        .route("/api/loans/:id", axum::routing::delete(delete_loan))
        .route(
            "/api/loans/payments",
            axum::routing::post(record_payment),
        )
}
