//! Notification models and builders for the RunaMitra record store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::loan::{LoanAgreement, LoanDirection};

/// Notification category
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentDue,
    PaymentOverdue,
    LoanCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentDue => "payment_due",
            NotificationKind::PaymentOverdue => "payment_overdue",
            NotificationKind::LoanCompleted => "loan_completed",
        }
    }
}

/// User-facing alert tied to a loan
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub loan_id: String,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub synced: bool,
}

impl Notification {
    /// Deterministic id derived from kind, loan and calendar day
    ///
    /// Re-running a scan on the same day upserts instead of piling up
    /// duplicate alerts.
    fn make_id(kind: NotificationKind, loan_id: &str, day: NaiveDate) -> String {
        format!("{}_{}_{}", kind.as_str(), loan_id, day.format("%Y-%m-%d"))
    }

    /// Alert for a payment due within the reminder window
    pub fn payment_due(
        loan: &LoanAgreement,
        days_left: i64,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let title = match loan.direction {
            LoanDirection::Lend => "Payment Due from Borrower",
            LoanDirection::Borrow => "Payment Due",
        };
        Notification {
            id: Self::make_id(NotificationKind::PaymentDue, &loan.id, day),
            kind: NotificationKind::PaymentDue,
            loan_id: loan.id.clone(),
            title: title.to_string(),
            message: format!(
                "₹{} payment due in {} {}",
                format_inr(loan.remaining_balance),
                days_left,
                day_word(days_left)
            ),
            date: now,
            read: false,
            synced: false,
        }
    }

    /// Alert for a payment past its repayment date
    pub fn payment_overdue(
        loan: &LoanAgreement,
        days_overdue: i64,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let title = match loan.direction {
            LoanDirection::Lend => "Overdue Payment from Borrower",
            LoanDirection::Borrow => "Payment Overdue",
        };
        Notification {
            id: Self::make_id(NotificationKind::PaymentOverdue, &loan.id, day),
            kind: NotificationKind::PaymentOverdue,
            loan_id: loan.id.clone(),
            title: title.to_string(),
            message: format!(
                "₹{} payment is {} {} overdue",
                format_inr(loan.remaining_balance),
                days_overdue,
                day_word(days_overdue)
            ),
            date: now,
            read: false,
            synced: false,
        }
    }

    /// Alert emitted when a payment clears the remaining balance
    pub fn loan_completed(loan: &LoanAgreement, day: NaiveDate, now: DateTime<Utc>) -> Self {
        let (title, message) = match loan.direction {
            LoanDirection::Lend => (
                "Loan Repaid by Borrower",
                format!(
                    "₹{} fully repaid by {}",
                    format_inr(loan.total_paid),
                    loan.borrower.name
                ),
            ),
            LoanDirection::Borrow => (
                "Loan Fully Repaid",
                format!(
                    "₹{} fully repaid to {}",
                    format_inr(loan.total_paid),
                    loan.lender.name
                ),
            ),
        };
        Notification {
            id: Self::make_id(NotificationKind::LoanCompleted, &loan.id, day),
            kind: NotificationKind::LoanCompleted,
            loan_id: loan.id.clone(),
            title: title.to_string(),
            message,
            date: now,
            read: false,
            synced: false,
        }
    }
}

fn day_word(n: i64) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

/// Format a rupee amount with Indian digit grouping (12,34,567.89)
pub fn format_inr(amount: f64) -> String {
    let negative = amount < 0.0;
    let paise = (amount.abs() * 100.0).round() as u64;
    let rupees = paise / 100;
    let fraction = paise % 100;

    let digits = rupees.to_string();
    let grouped = if digits.len() > 3 {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut idx = head.len();
        while idx > 2 {
            parts.push(&head[idx - 2..idx]);
            idx -= 2;
        }
        parts.push(&head[..idx]);
        parts.reverse();
        format!("{},{}", parts.join(","), tail)
    } else {
        digits
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        out.push_str(&format!(".{:02}", fraction));
    }
    out
}
