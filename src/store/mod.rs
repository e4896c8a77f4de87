//! The record store: sole owner of persisted domain state
//!
//! Loans and notifications live as JSON collections under fixed keys in
//! the local SQLite file, mirroring the mobile app's storage contract.
//! Every mutation is a transactional read-modify-write of a whole
//! collection, marks the touched records dirty, and nudges the sync
//! worker when the device is online. Local state is authoritative; sync
//! only ever flips flags after a successful push.

mod ids;

pub use ids::generate_id;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::mpsc;

use crate::error::{StoreError, StoreResult};
use crate::loan::{LoanAgreement, LoanUpsert, PaymentRecord, RecordPaymentRequest};
use crate::notification::Notification;
use crate::sync::{Connectivity, SyncSnapshot, SyncTrigger};

const LOANS_KEY: &str = "loans";
const NOTIFICATIONS_KEY: &str = "notifications";
const LAST_SYNC_KEY: &str = "lastSyncTime";

/// Reminder window for upcoming payments, in days
const PAYMENT_DUE_WINDOW_DAYS: i64 = 7;

const UPSERT_SQL: &str =
    "INSERT INTO collections (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// Current sync posture, as reported to collaborators
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub needs_sync: bool,
    pub is_online: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Export document, the app's interchange format
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub loans: Vec<LoanAgreement>,
    pub notifications: Vec<Notification>,
    pub export_date: DateTime<Utc>,
}

/// Import payload
///
/// All three export fields must be present and well formed; anything
/// else is rejected before any state changes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub loans: Vec<LoanAgreement>,
    pub notifications: Vec<Notification>,
    pub export_date: DateTime<Utc>,
}

/// Counts of records replaced by an import
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub loans_count: usize,
    pub notifications_count: usize,
}

/// Offline-first record store over the local database
pub struct RecordStore {
    pool: SqlitePool,
    connectivity: Connectivity,
    sync_tx: mpsc::Sender<SyncTrigger>,
}

impl RecordStore {
    pub fn new(
        pool: SqlitePool,
        connectivity: Connectivity,
        sync_tx: mpsc::Sender<SyncTrigger>,
    ) -> Self {
        Self {
            pool,
            connectivity,
            sync_tx,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- loan operations ----

    /// Merge a batch of loans into the collection
    ///
    /// Existing ids are replaced wholesale, new ids appended, missing ids
    /// minted. Every touched record is marked dirty without diffing
    /// against what was stored before.
    pub async fn upsert_loans(&self, batch: Vec<LoanUpsert>) -> StoreResult<Vec<LoanAgreement>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let mut loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;

        let mut saved = Vec::with_capacity(batch.len());
        for incoming in batch {
            let id = incoming.id.unwrap_or_else(generate_id);
            let existing = loans.iter().position(|l| l.id == id);
            let created_at = incoming
                .created_at
                .or_else(|| existing.map(|i| loans[i].created_at))
                .unwrap_or(now);

            let mut record = LoanAgreement {
                id,
                direction: incoming.direction,
                amount: incoming.amount,
                interest_rate: incoming.interest_rate,
                repayment_date: incoming.repayment_date,
                created_at,
                updated_at: now,
                lender: incoming.lender,
                borrower: incoming.borrower,
                id_proof_type: incoming.id_proof_type,
                id_proof_ref: incoming.id_proof_ref,
                contract_generated: incoming.contract_generated,
                contract_ref: incoming.contract_ref,
                total_paid: 0.0,
                remaining_balance: 0.0,
                payments: incoming.payments,
                synced: false,
                needs_sync: true,
            };
            for payment in &mut record.payments {
                payment.loan_id = record.id.clone();
            }
            record.recalculate();
            record.mark_dirty(now);

            match existing {
                Some(index) => loans[index] = record.clone(),
                None => loans.push(record.clone()),
            }
            saved.push(record);
        }

        Self::save_tx(&mut tx, LOANS_KEY, &loans).await?;
        tx.commit().await?;

        tracing::info!(count = saved.len(), "Upserted loans");
        self.request_sync(SyncTrigger::Mutation);

        Ok(saved)
    }

    /// All loan agreements as stored
    pub async fn get_loans(&self) -> StoreResult<Vec<LoanAgreement>> {
        self.load(LOANS_KEY).await
    }

    /// Fetch one loan by id
    pub async fn get_loan_by_id(&self, id: &str) -> StoreResult<Option<LoanAgreement>> {
        let loans = self.get_loans().await?;
        Ok(loans.into_iter().find(|l| l.id == id))
    }

    /// Remove a loan permanently
    ///
    /// Deletion is terminal: no tombstone is kept and a later sync never
    /// resurrects the record. A missing id is a silent no-op.
    pub async fn delete_loan(&self, id: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let mut loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;

        let before = loans.len();
        loans.retain(|l| l.id != id);
        if loans.len() == before {
            tracing::debug!(loan_id = %id, "Delete requested for unknown loan");
            return Ok(false);
        }

        Self::save_tx(&mut tx, LOANS_KEY, &loans).await?;
        tx.commit().await?;

        tracing::info!(loan_id = %id, "Deleted loan");
        self.request_sync(SyncTrigger::Mutation);

        Ok(true)
    }

    /// Record a payment against an existing loan
    ///
    /// Replaces by payment id or appends, then recomputes the derived
    /// totals. An unknown loan id fails with NotFound and writes nothing.
    pub async fn record_payment(&self, req: RecordPaymentRequest) -> StoreResult<LoanAgreement> {
        let now = Utc::now();
        let today = now.date_naive();

        let mut tx = self.pool.begin().await?;
        let mut loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;

        let index = loans
            .iter()
            .position(|l| l.id == req.loan_id)
            .ok_or_else(|| StoreError::NotFound(format!("Loan {}", req.loan_id)))?;

        let payment = PaymentRecord {
            id: req.id.unwrap_or_else(generate_id),
            loan_id: req.loan_id.clone(),
            amount: req.amount,
            date: req.date.unwrap_or(today),
            method: req.method,
            notes: req.notes,
            synced: false,
        };

        let loan = &mut loans[index];
        let was_outstanding = loan.remaining_balance > 0.0;
        match loan.payments.iter().position(|p| p.id == payment.id) {
            Some(i) => loan.payments[i] = payment,
            None => loan.payments.push(payment),
        }
        loan.recalculate();
        loan.mark_dirty(now);
        let updated = loan.clone();

        Self::save_tx(&mut tx, LOANS_KEY, &loans).await?;

        // A payment that clears the balance also leaves a completion alert.
        if was_outstanding && updated.remaining_balance <= 0.0 {
            let mut notifications: Vec<Notification> =
                Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;
            let alert = Notification::loan_completed(&updated, today, now);
            if !notifications.iter().any(|n| n.id == alert.id) {
                notifications.push(alert);
                Self::save_tx(&mut tx, NOTIFICATIONS_KEY, &notifications).await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            loan_id = %updated.id,
            total_paid = updated.total_paid,
            remaining = updated.remaining_balance,
            "Recorded payment"
        );
        self.request_sync(SyncTrigger::Mutation);

        Ok(updated)
    }

    // ---- notification operations ----

    /// Scan loans and produce due and overdue alerts
    ///
    /// Only loans with an outstanding balance qualify. Re-running the
    /// scan on the same day is idempotent; existing alerts keep their
    /// read state. Returns the newly created alerts.
    pub async fn generate_payment_notifications(&self) -> StoreResult<Vec<Notification>> {
        let now = Utc::now();
        let today = now.date_naive();

        let mut tx = self.pool.begin().await?;
        let loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;
        let mut notifications: Vec<Notification> =
            Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;

        let mut created = Vec::new();
        for loan in loans.iter().filter(|l| l.remaining_balance > 0.0) {
            let days = loan.days_until_due(today);
            let alert = if days > 0 && days <= PAYMENT_DUE_WINDOW_DAYS {
                Notification::payment_due(loan, days, today, now)
            } else if days < 0 {
                Notification::payment_overdue(loan, -days, today, now)
            } else {
                continue;
            };

            if !notifications.iter().any(|n| n.id == alert.id) {
                notifications.push(alert.clone());
                created.push(alert);
            }
        }

        if created.is_empty() {
            return Ok(created);
        }

        Self::save_tx(&mut tx, NOTIFICATIONS_KEY, &notifications).await?;
        tx.commit().await?;

        tracing::info!(count = created.len(), "Generated payment notifications");
        self.request_sync(SyncTrigger::Mutation);

        Ok(created)
    }

    /// All notifications as stored
    pub async fn get_notifications(&self) -> StoreResult<Vec<Notification>> {
        self.load(NOTIFICATIONS_KEY).await
    }

    /// Mark a single notification as read
    ///
    /// Read state is device-local and does not dirty the record for sync.
    pub async fn mark_notification_read(&self, id: &str) -> StoreResult<Notification> {
        let mut tx = self.pool.begin().await?;
        let mut notifications: Vec<Notification> =
            Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;

        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Notification {}", id)))?;
        notification.read = true;
        let updated = notification.clone();

        Self::save_tx(&mut tx, NOTIFICATIONS_KEY, &notifications).await?;
        tx.commit().await?;

        Ok(updated)
    }

    // ---- sync status and interchange ----

    /// Current sync posture
    pub async fn get_sync_status(&self) -> StoreResult<SyncStatus> {
        let loans: Vec<LoanAgreement> = self.load(LOANS_KEY).await?;
        let notifications: Vec<Notification> = self.load(NOTIFICATIONS_KEY).await?;

        let needs_sync =
            loans.iter().any(|l| l.needs_sync) || notifications.iter().any(|n| !n.synced);

        Ok(SyncStatus {
            needs_sync,
            is_online: self.connectivity.is_online(),
            last_sync: self.last_sync_time().await?,
        })
    }

    /// Export both collections as an interchange document
    pub async fn export_data(&self) -> StoreResult<ExportDocument> {
        let mut tx = self.pool.begin().await?;
        let loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;
        let notifications: Vec<Notification> =
            Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;
        tx.commit().await?;

        Ok(ExportDocument {
            loans,
            notifications,
            export_date: Utc::now(),
        })
    }

    /// Replace local state wholesale from an interchange document
    ///
    /// The payload is validated before anything is written; malformed
    /// input aborts with a format error and stored state is untouched.
    pub async fn import_data(&self, payload: &str) -> StoreResult<ImportSummary> {
        let document: ImportDocument = serde_json::from_str(payload)
            .map_err(|e| StoreError::Format(format!("Invalid data format: {}", e)))?;

        let mut tx = self.pool.begin().await?;
        Self::save_tx(&mut tx, LOANS_KEY, &document.loans).await?;
        Self::save_tx(&mut tx, NOTIFICATIONS_KEY, &document.notifications).await?;
        tx.commit().await?;

        tracing::info!(
            loans = document.loans.len(),
            notifications = document.notifications.len(),
            "Imported data, local state replaced"
        );
        self.request_sync(SyncTrigger::Mutation);

        Ok(ImportSummary {
            loans_count: document.loans.len(),
            notifications_count: document.notifications.len(),
        })
    }

    // ---- connectivity and sync triggering ----

    /// Record the connectivity state reported by the host shell
    ///
    /// Coming back online schedules a sync for whatever queued up while
    /// offline.
    pub fn set_connectivity(&self, online: bool) {
        let was_online = self.connectivity.set_online(online);
        match (was_online, online) {
            (false, true) => {
                tracing::info!("Connectivity restored");
                self.request_sync(SyncTrigger::Connectivity);
            }
            (true, false) => {
                tracing::info!("Connectivity lost, mutations will queue locally");
            }
            _ => {}
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Hand the sync worker a trigger, without waiting
    ///
    /// Returns whether a cycle is pending after the call. Skipped while
    /// offline. A full trigger slot means a cycle is already queued, so
    /// dropping the extra request loses nothing.
    pub fn request_sync(&self, trigger: SyncTrigger) -> bool {
        if !self.connectivity.is_online() {
            tracing::debug!(trigger = trigger.as_str(), "Offline, sync not requested");
            return false;
        }
        match self.sync_tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(
                    trigger = trigger.as_str(),
                    "Sync already pending, extra request dropped"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Sync worker is not running");
                false
            }
        }
    }

    // ---- sync worker interface ----

    /// Snapshot the unsynced sets for a push cycle
    pub async fn sync_snapshot(&self) -> StoreResult<SyncSnapshot> {
        let mut tx = self.pool.begin().await?;
        let loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;
        let notifications: Vec<Notification> =
            Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;
        tx.commit().await?;

        Ok(SyncSnapshot {
            loans: loans.into_iter().filter(|l| l.needs_sync).collect(),
            notifications: notifications.into_iter().filter(|n| !n.synced).collect(),
        })
    }

    /// Flip sync flags for a pushed snapshot and stamp the sync time
    ///
    /// A loan that changed after the snapshot was taken keeps its dirty
    /// flags and rides the next cycle. A synced loan's payments are
    /// marked synced with it.
    pub async fn commit_synced(
        &self,
        snapshot: &SyncSnapshot,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut loans: Vec<LoanAgreement> = Self::load_tx(&mut tx, LOANS_KEY).await?;
        let mut notifications: Vec<Notification> =
            Self::load_tx(&mut tx, NOTIFICATIONS_KEY).await?;

        for pushed in &snapshot.loans {
            if let Some(loan) = loans.iter_mut().find(|l| l.id == pushed.id) {
                if loan.updated_at == pushed.updated_at {
                    loan.synced = true;
                    loan.needs_sync = false;
                    for payment in &mut loan.payments {
                        payment.synced = true;
                    }
                }
            }
        }
        for pushed in &snapshot.notifications {
            if let Some(notification) = notifications.iter_mut().find(|n| n.id == pushed.id) {
                notification.synced = true;
            }
        }

        Self::save_tx(&mut tx, LOANS_KEY, &loans).await?;
        Self::save_tx(&mut tx, NOTIFICATIONS_KEY, &notifications).await?;
        Self::save_raw_tx(&mut tx, LAST_SYNC_KEY, &now.to_rfc3339()).await?;
        tx.commit().await?;

        Ok(())
    }

    // ---- collection plumbing ----

    async fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM collections WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        decode_collection(key, row)
    }

    async fn load_tx<T: DeserializeOwned>(
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
    ) -> StoreResult<Vec<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM collections WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut **tx)
            .await?;
        decode_collection(key, row)
    }

    async fn save_tx<T: Serialize>(
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
        records: &[T],
    ) -> StoreResult<()> {
        let value = serde_json::to_string(records).map_err(|e| {
            StoreError::Storage(format!("failed to encode {} collection: {}", key, e))
        })?;
        Self::save_raw_tx(tx, key, &value).await
    }

    async fn save_raw_tx(
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
        value: &str,
    ) -> StoreResult<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn last_sync_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM collections WHERE key = ?")
            .bind(LAST_SYNC_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(value,)| match value.parse::<DateTime<Utc>>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                tracing::warn!("Stored last-sync timestamp is unreadable, ignoring");
                None
            }
        }))
    }
}

fn decode_collection<T: DeserializeOwned>(key: &str, row: Option<(String,)>) -> StoreResult<Vec<T>> {
    match row {
        Some((value,)) => serde_json::from_str(&value)
            .map_err(|e| StoreError::Storage(format!("corrupt {} collection: {}", key, e))),
        None => Ok(Vec::new()),
    }
}
