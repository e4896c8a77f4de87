//! Due-date scan tests
//!
//! The scan walks outstanding loans and raises payment_due alerts inside the
//! seven-day reminder window and payment_overdue alerts past the repayment
//! date. Loans here are created relative to today so the windows line up.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::mpsc;

use runamitra_server::db;
use runamitra_server::loan::{LoanDirection, LoanUpsert, Party, RecordPaymentRequest};
use runamitra_server::notification::NotificationKind;
use runamitra_server::store::RecordStore;
use runamitra_server::sync::Connectivity;

async fn setup_store() -> Arc<RecordStore> {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    db::init_schema(&pool).await.expect("Failed to bootstrap schema");

    let (sync_tx, _sync_rx) = mpsc::channel(1);
    // The receiver is dropped, so trigger sends are silently skipped
    Arc::new(RecordStore::new(pool, Connectivity::new(true), sync_tx))
}

fn party(name: &str) -> Party {
    Party {
        name: name.to_string(),
        phone: "9876543210".to_string(),
        address: "Tenali".to_string(),
    }
}

fn due_date(days_from_today: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days_from_today)
}

/// Interest-free loan of 55,000 so the outstanding amount stays exact
fn loan_due_in(id: &str, direction: LoanDirection, days_from_today: i64) -> LoanUpsert {
    LoanUpsert {
        id: Some(id.to_string()),
        direction,
        amount: 55000.0,
        interest_rate: 0.0,
        repayment_date: due_date(days_from_today),
        created_at: Some(Utc::now() - Duration::days(60)),
        lender: party("Lakshmi"),
        borrower: party("Suresh"),
        id_proof_type: "aadhaar".to_string(),
        id_proof_ref: None,
        contract_generated: false,
        contract_ref: None,
        payments: Vec::new(),
    }
}

// ============================================================================
// Reminder window
// ============================================================================

#[tokio::test]
async fn test_due_soon_raises_payment_due() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 3)])
        .await
        .unwrap();

    let created = store.generate_payment_notifications().await.unwrap();

    assert_eq!(created.len(), 1);
    let alert = &created[0];
    assert_eq!(alert.kind, NotificationKind::PaymentDue);
    assert_eq!(alert.loan_id, "l1");
    assert_eq!(alert.title, "Payment Due from Borrower");
    assert_eq!(alert.message, "₹55,000 payment due in 3 days");
    assert!(alert.id.starts_with("payment_due_l1_"));
    assert!(!alert.read);
    assert!(!alert.synced);
}

#[tokio::test]
async fn test_overdue_raises_payment_overdue() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Borrow, -2)])
        .await
        .unwrap();

    let created = store.generate_payment_notifications().await.unwrap();

    assert_eq!(created.len(), 1);
    let alert = &created[0];
    assert_eq!(alert.kind, NotificationKind::PaymentOverdue);
    assert_eq!(alert.title, "Payment Overdue");
    assert_eq!(alert.message, "₹55,000 payment is 2 days overdue");
}

#[tokio::test]
async fn test_far_future_due_date_is_quiet() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 10)])
        .await
        .unwrap();

    assert!(store.generate_payment_notifications().await.unwrap().is_empty());
    assert!(store.get_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_due_today_is_quiet() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 0)])
        .await
        .unwrap();

    assert!(store.generate_payment_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_window_includes_the_seventh_day() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 7)])
        .await
        .unwrap();

    let created = store.generate_payment_notifications().await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].kind, NotificationKind::PaymentDue);

    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 8)])
        .await
        .unwrap();
    assert!(store.generate_payment_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_settled_loans_are_quiet() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 3)])
        .await
        .unwrap();
    store
        .record_payment(RecordPaymentRequest {
            loan_id: "l1".to_string(),
            id: None,
            amount: 55000.0,
            date: None,
            method: "upi".to_string(),
            notes: None,
        })
        .await
        .unwrap();

    // The clearing payment already left a completion alert; the scan adds
    // nothing on top of it.
    assert!(store.generate_payment_notifications().await.unwrap().is_empty());
    let notifications = store.get_notifications().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::LoanCompleted);
}

// ============================================================================
// Dedup across rescans
// ============================================================================

#[tokio::test]
async fn test_same_day_rescan_is_idempotent_and_keeps_read_state() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Lend, 3)])
        .await
        .unwrap();

    let first = store.generate_payment_notifications().await.unwrap();
    assert_eq!(first.len(), 1);
    store.mark_notification_read(&first[0].id).await.unwrap();

    let second = store.generate_payment_notifications().await.unwrap();
    assert!(second.is_empty());

    let notifications = store.get_notifications().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].read);
}

#[tokio::test]
async fn test_mixed_portfolio_scan() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![
            loan_due_in("due", LoanDirection::Lend, 5),
            loan_due_in("late", LoanDirection::Borrow, -9),
            loan_due_in("distant", LoanDirection::Lend, 45),
        ])
        .await
        .unwrap();

    let created = store.generate_payment_notifications().await.unwrap();
    assert_eq!(created.len(), 2);

    let kinds: Vec<(String, NotificationKind)> = created
        .iter()
        .map(|n| (n.loan_id.clone(), n.kind))
        .collect();
    assert!(kinds.contains(&("due".to_string(), NotificationKind::PaymentDue)));
    assert!(kinds.contains(&("late".to_string(), NotificationKind::PaymentOverdue)));
}

#[tokio::test]
async fn test_singular_day_message() {
    let store = setup_store().await;
    store
        .upsert_loans(vec![loan_due_in("l1", LoanDirection::Borrow, 1)])
        .await
        .unwrap();

    let created = store.generate_payment_notifications().await.unwrap();
    assert_eq!(created[0].message, "₹55,000 payment due in 1 day");
}
