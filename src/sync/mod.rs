//! Opportunistic cloud sync for the RunaMitra record store
//!
//! Local storage is always authoritative. The sync worker pushes whatever
//! is flagged unsynced whenever connectivity and a trigger line up, and a
//! failed push costs nothing but a retry.

mod engine;
mod transport;

pub use engine::SyncEngine;
pub use transport::{SimulatedCloud, SyncTransport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::loan::LoanAgreement;
use crate::notification::Notification;

/// Reason a sync cycle was requested, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// A local mutation completed while online
    Mutation,
    /// Connectivity was restored after an offline stretch
    Connectivity,
    /// A collaborator asked for a sync explicitly
    Manual,
    /// The worker rescheduled itself after a failure
    Retry,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Mutation => "mutation",
            SyncTrigger::Connectivity => "connectivity",
            SyncTrigger::Manual => "manual",
            SyncTrigger::Retry => "retry",
        }
    }
}

/// Errors a sync cycle can end with
///
/// These never surface from store operations; they ride the event stream
/// as `StoreEvent::SyncFailed` and the cycle is retried later.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Cloud push failed: {0}")]
    Transport(String),

    #[error("Cloud push timed out after {0}s")]
    Timeout(u64),

    #[error("Storage error during sync: {0}")]
    Storage(String),
}

/// Events emitted by the sync worker for collaborators
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    #[serde(rename_all = "camelCase")]
    DataSynced {
        loans_count: usize,
        notifications_count: usize,
    },
    SyncFailed {
        error: String,
    },
}

/// The unsynced records captured at the start of a cycle
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub loans: Vec<LoanAgreement>,
    pub notifications: Vec<Notification>,
}

impl SyncSnapshot {
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty() && self.notifications.is_empty()
    }
}

/// Shared connectivity flag, reported by the host shell
///
/// The store is headless and cannot read the device radio itself.
#[derive(Clone, Default)]
pub struct Connectivity(Arc<AtomicBool>);

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Connectivity(Arc::new(AtomicBool::new(online)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag, returning the previous value
    pub fn set_online(&self, online: bool) -> bool {
        self.0.swap(online, Ordering::SeqCst)
    }
}

/// Delay before the next retry after `failures` consecutive failed cycles
///
/// Doubles from the base up to a factor of 256, so a 5 second base tops
/// out at about 21 minutes.
pub fn backoff_delay(base_secs: u64, failures: u32) -> Duration {
    let exp = failures.min(8);
    Duration::from_secs(base_secs.saturating_mul(2u64.saturating_pow(exp)))
}
