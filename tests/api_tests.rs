//! API surface tests
//!
//! Drive the full router with in-process requests and assert on status
//! codes and response bodies, including the structured error envelope.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;

use runamitra_server::db;
use runamitra_server::routes;
use runamitra_server::state::AppState;
use runamitra_server::store::RecordStore;
use runamitra_server::sync::{Connectivity, SyncTrigger};
use runamitra_server::websocket::WsState;

async fn test_app() -> (Router, mpsc::Receiver<SyncTrigger>) {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    db::init_schema(&pool).await.expect("Failed to bootstrap schema");

    let (sync_tx, sync_rx) = mpsc::channel(1);
    let (events_tx, _events_rx) = broadcast::channel(16);
    let store = Arc::new(RecordStore::new(pool, Connectivity::new(true), sync_tx));

    let state = AppState::new(store, WsState::new(events_tx));
    let app = routes::api_router().with_state(state);
    (app, sync_rx)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn loan_json(id: &str) -> Value {
    json!({
        "id": id,
        "direction": "lend",
        "amount": 10000.0,
        "interestRate": 12.0,
        "repaymentDate": "2024-12-31",
        "createdAt": "2024-01-01T00:00:00Z",
        "lender": { "name": "Ravi", "phone": "9876543210", "address": "Tenali" },
        "borrower": { "name": "Suresh", "phone": "9123456780", "address": "Guntur" },
        "idProofType": "aadhaar",
        "contractGenerated": false,
        "payments": []
    })
}

// ============================================================================
// Loans
// ============================================================================

#[tokio::test]
async fn test_loan_crud_over_http() {
    let (app, _rx) = test_app().await;

    let response = app.clone().oneshot(get("/api/loans")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!([]));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/loans",
            json!({ "loans": [loan_json("l1")] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = response_json(response).await;
    assert_eq!(saved[0]["id"], "l1");
    assert_eq!(saved[0]["needsSync"], true);
    assert_eq!(saved[0]["synced"], false);

    let response = app.clone().oneshot(get("/api/loans/l1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let loan = response_json(response).await;
    assert_eq!(loan["amount"], 10000.0);
    assert!((loan["remainingBalance"].as_f64().unwrap() - 11200.0).abs() < 1e-9);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/loans/l1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "deleted": true }));

    let response = app.clone().oneshot(get("/api/loans/l1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upsert_rejects_invalid_amounts() {
    let (app, _rx) = test_app().await;

    let mut bad = loan_json("l1");
    bad["amount"] = json!(-5.0);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/loans", json!({ "loans": [bad] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Nothing was stored
    let response = app.clone().oneshot(get("/api/loans")).await.unwrap();
    assert_eq!(response_json(response).await, json!([]));
}

#[tokio::test]
async fn test_upsert_rejects_negative_payment_amounts() {
    let (app, _rx) = test_app().await;

    // A negative amount nested in the payment list must trip the same
    // guard as the top-level fields
    let mut bad = loan_json("l1");
    bad["payments"] = json!([{
        "id": "p1",
        "loanId": "l1",
        "amount": -500.0,
        "date": "2024-02-01",
        "method": "cash"
    }]);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/loans", json!({ "loans": [bad] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let response = app.clone().oneshot(get("/api/loans")).await.unwrap();
    assert_eq!(response_json(response).await, json!([]));
}

#[tokio::test]
async fn test_record_payment_over_http() {
    let (app, _rx) = test_app().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/loans",
            json!({ "loans": [loan_json("l1")] }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/loans/payments",
            json!({ "loanId": "l1", "amount": 3000.0, "method": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let loan = response_json(response).await;
    assert!((loan["totalPaid"].as_f64().unwrap() - 3000.0).abs() < 1e-9);
    assert!((loan["remainingBalance"].as_f64().unwrap() - 8200.0).abs() < 1e-9);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/loans/payments",
            json!({ "loanId": "ghost", "amount": 100.0, "method": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_notification_flow_over_http() {
    let (app, _rx) = test_app().await;

    // A 2024 repayment date is long past due by now
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/loans",
            json!({ "loans": [loan_json("l1")] }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/notifications/generate", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = response_json(response).await;
    assert_eq!(created.as_array().unwrap().len(), 1);
    assert_eq!(created[0]["type"], "payment_overdue");
    let id = created[0]["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get("/api/notifications")).await.unwrap();
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/notifications/{}/read", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["read"], true);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/notifications/ghost/read", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Sync surface
// ============================================================================

#[tokio::test]
async fn test_sync_surface_over_http() {
    let (app, mut rx) = test_app().await;

    let response = app.clone().oneshot(get("/api/sync/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = response_json(response).await;
    assert_eq!(status["needsSync"], false);
    assert_eq!(status["isOnline"], true);
    assert_eq!(status["lastSync"], Value::Null);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/sync/connectivity",
            json!({ "isOnline": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response_json(response).await, json!({ "isOnline": false }));

    // Manual sync while offline is refused
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/sync", json!({})))
        .await
        .unwrap();
    assert_eq!(response_json(response).await, json!({ "requested": false }));

    // Back online, the request lands on the trigger channel
    app.clone()
        .oneshot(json_request(
            "PUT",
            "/api/sync/connectivity",
            json!({ "isOnline": true }),
        ))
        .await
        .unwrap();
    assert!(matches!(rx.try_recv(), Ok(SyncTrigger::Connectivity)));

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/sync", json!({})))
        .await
        .unwrap();
    assert_eq!(response_json(response).await, json!({ "requested": true }));
    assert!(matches!(rx.try_recv(), Ok(SyncTrigger::Manual)));
}

// ============================================================================
// Export and import
// ============================================================================

#[tokio::test]
async fn test_export_import_over_http() {
    let (app, _rx) = test_app().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/loans",
            json!({ "loans": [loan_json("l1")] }),
        ))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/api/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("runamitra-backup.json"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let exported = String::from_utf8(bytes.to_vec()).unwrap();
    let document: Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(document["loans"].as_array().unwrap().len(), 1);

    // Import the backup into a fresh instance
    let (fresh, _rx2) = test_app().await;
    let response = fresh
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(exported))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = response_json(response).await;
    assert_eq!(summary["loansCount"], 1);

    let response = fresh.clone().oneshot(get("/api/loans/l1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Malformed payloads are rejected up front
    let response = fresh
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not a backup"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
