//! Loan agreement models and data structures for the RunaMitra record store
//!
//! Field names serialize as camelCase so stored collections and export
//! files stay interchangeable with the mobile app's existing data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Days in the interest year used by the balance formula
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Direction of a loan from the app user's point of view
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanDirection {
    Lend,
    Borrow,
}

/// Party to a loan agreement
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Payment applied against a loan
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub loan_id: String,
    #[validate(range(min = 0.01, message = "Amount must be greater than 0"))]
    pub amount: f64,
    pub date: NaiveDate,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub synced: bool,
}

/// Loan agreement, the root record of the store
///
/// `total_paid` and `remaining_balance` are derived and recomputed on
/// every mutation; `payments` is the authoritative source for both.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanAgreement {
    pub id: String,
    pub direction: LoanDirection,
    pub amount: f64,
    pub interest_rate: f64,
    pub repayment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lender: Party,
    pub borrower: Party,
    pub id_proof_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_proof_ref: Option<String>,
    #[serde(default)]
    pub contract_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_ref: Option<String>,
    #[serde(default)]
    pub total_paid: f64,
    #[serde(default)]
    pub remaining_balance: f64,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub needs_sync: bool,
}

impl LoanAgreement {
    /// Loan term in fractional years, anchored to the repayment date
    ///
    /// Interest accrues over the agreed term regardless of when the
    /// balance is computed.
    pub fn term_years(&self) -> f64 {
        let days = (self.repayment_date - self.created_at.date_naive()).num_days();
        days as f64 / DAYS_PER_YEAR
    }

    /// Total owed at the repayment date under simple interest
    pub fn total_owed(&self) -> f64 {
        self.amount * (1.0 + (self.interest_rate / 100.0) * self.term_years())
    }

    /// Recompute `total_paid` and `remaining_balance` from the payment list
    pub fn recalculate(&mut self) {
        self.total_paid = self.payments.iter().map(|p| p.amount).sum();
        self.remaining_balance = (self.total_owed() - self.total_paid).max(0.0);
    }

    /// Mark the record as locally modified and awaiting sync
    pub fn mark_dirty(&mut self, now: DateTime<Utc>) {
        self.needs_sync = true;
        self.synced = false;
        self.updated_at = now;
    }

    /// Whole days until the repayment date, negative once overdue
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.repayment_date - today).num_days()
    }
}

/// Incoming loan payload for the upsert operation
///
/// Identifiers and bookkeeping fields are optional; the store mints ids
/// and recomputes derived values on save.
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanUpsert {
    pub id: Option<String>,
    pub direction: LoanDirection,
    #[validate(range(min = 0.01, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(range(min = 0.0, message = "Interest rate must not be negative"))]
    pub interest_rate: f64,
    pub repayment_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
    pub lender: Party,
    pub borrower: Party,
    pub id_proof_type: String,
    pub id_proof_ref: Option<String>,
    #[serde(default)]
    pub contract_generated: bool,
    pub contract_ref: Option<String>,
    #[serde(default)]
    #[validate]
    pub payments: Vec<PaymentRecord>,
}

/// Request DTO for upserting a batch of loans
///
/// An empty batch is a valid no-op. Each element is validated
/// individually before the merge.
#[derive(Debug, Deserialize)]
pub struct UpsertLoansRequest {
    pub loans: Vec<LoanUpsert>,
}

/// Request DTO for recording a payment
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub loan_id: String,
    pub id: Option<String>,
    #[validate(range(min = 0.01, message = "Amount must be greater than 0"))]
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub method: String,
    pub notes: Option<String>,
}
