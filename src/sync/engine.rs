//! Background sync worker
//!
//! Owns the Idle/Syncing state machine: the worker is idle while parked on
//! its trigger channel and syncing while a cycle runs. Mutation paths hand
//! it work through a bounded channel and never wait on the push.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, timeout, Instant};

use crate::store::RecordStore;

use super::{backoff_delay, Connectivity, StoreEvent, SyncError, SyncTrigger, SyncTransport};

/// Sync worker driving push cycles against a transport
pub struct SyncEngine<T: SyncTransport> {
    store: Arc<RecordStore>,
    transport: T,
    connectivity: Connectivity,
    triggers: mpsc::Receiver<SyncTrigger>,
    events: broadcast::Sender<StoreEvent>,
    push_timeout: Duration,
    retry_base_secs: u64,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub fn new(
        store: Arc<RecordStore>,
        transport: T,
        connectivity: Connectivity,
        triggers: mpsc::Receiver<SyncTrigger>,
        events: broadcast::Sender<StoreEvent>,
        push_timeout: Duration,
        retry_base_secs: u64,
    ) -> Self {
        Self {
            store,
            transport,
            connectivity,
            triggers,
            events,
            push_timeout,
            retry_base_secs,
        }
    }

    /// Worker loop; runs until every trigger sender is dropped
    pub async fn run(mut self) {
        tracing::info!("Sync worker started");

        let mut failures: u32 = 0;
        let mut retry_at: Option<Instant> = None;

        loop {
            let trigger = if let Some(deadline) = retry_at {
                tokio::select! {
                    msg = self.triggers.recv() => match msg {
                        Some(trigger) => trigger,
                        None => break,
                    },
                    _ = sleep_until(deadline) => SyncTrigger::Retry,
                }
            } else {
                match self.triggers.recv().await {
                    Some(trigger) => trigger,
                    None => break,
                }
            };
            retry_at = None;

            if !self.connectivity.is_online() {
                tracing::debug!(trigger = trigger.as_str(), "Skipping sync while offline");
                continue;
            }

            tracing::debug!(trigger = trigger.as_str(), "Sync cycle starting");

            match self.run_cycle().await {
                Ok(None) => {
                    failures = 0;
                }
                Ok(Some((loans, notifications))) => {
                    failures = 0;
                    tracing::info!(loans, notifications, "Sync completed");
                    let _ = self.events.send(StoreEvent::DataSynced {
                        loans_count: loans,
                        notifications_count: notifications,
                    });
                }
                Err(err) => {
                    failures += 1;
                    let delay = backoff_delay(self.retry_base_secs, failures - 1);
                    tracing::warn!(
                        error = %err,
                        consecutive_failures = failures,
                        retry_in_secs = delay.as_secs(),
                        "Sync failed, retry scheduled"
                    );
                    let _ = self.events.send(StoreEvent::SyncFailed {
                        error: err.to_string(),
                    });
                    retry_at = Some(Instant::now() + delay);
                }
            }
        }

        tracing::info!("Sync worker stopped");
    }

    /// One push cycle: snapshot, push, flip flags
    ///
    /// Returns the snapshot counts, or `None` when there was nothing to
    /// push. Local state is never rolled back on failure.
    async fn run_cycle(&self) -> Result<Option<(usize, usize)>, SyncError> {
        let snapshot = self
            .store
            .sync_snapshot()
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        if snapshot.is_empty() {
            tracing::debug!("Nothing to sync");
            return Ok(None);
        }

        // The push runs outside any storage transaction. Mutations landing
        // while it is in flight stay dirty and ride the next cycle.
        match timeout(self.push_timeout, self.transport.push(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(SyncError::Timeout(self.push_timeout.as_secs())),
        }

        self.store
            .commit_synced(&snapshot, Utc::now())
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(Some((snapshot.loans.len(), snapshot.notifications.len())))
    }
}
