//! Transport seam between the sync worker and the cloud backend

use async_trait::async_trait;
use std::time::Duration;

use super::{SyncError, SyncSnapshot};

/// Push seam for unsynced records
///
/// The worker only ever pushes; the device copy is authoritative and
/// nothing is pulled back.
#[async_trait]
pub trait SyncTransport: Send + Sync + 'static {
    async fn push(&self, batch: &SyncSnapshot) -> Result<(), SyncError>;
}

/// Stand-in cloud backend: a fixed-delay round trip that always accepts
///
/// No real backend exists yet, so the push is simulated end to end. The
/// delay keeps the rest of the system honest about in-flight windows.
pub struct SimulatedCloud {
    delay: Duration,
}

impl SimulatedCloud {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl SyncTransport for SimulatedCloud {
    async fn push(&self, batch: &SyncSnapshot) -> Result<(), SyncError> {
        tracing::warn!(
            loans = batch.loans.len(),
            notifications = batch.notifications.len(),
            "Simulated cloud push (no real backend configured)"
        );

        tokio::time::sleep(self.delay).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_push_accepts_after_delay() {
        let transport = SimulatedCloud::new(10);
        let batch = SyncSnapshot {
            loans: Vec::new(),
            notifications: Vec::new(),
        };

        let started = std::time::Instant::now();
        transport.push(&batch).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
