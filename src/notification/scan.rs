//! Background due-date scan

use std::sync::Arc;
use std::time::Duration;

use crate::store::RecordStore;

/// Background job producing due and overdue alerts on a fixed interval
///
/// The manual generate endpoint stays available for on-demand scans; this
/// loop just keeps alerts fresh while the app sits open.
pub async fn due_date_scanner(store: Arc<RecordStore>, interval_secs: u64) {
    tracing::info!(interval_secs, "Starting due-date scanner");

    loop {
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;

        match store.generate_payment_notifications().await {
            Ok(created) if !created.is_empty() => {
                tracing::info!(count = created.len(), "Due-date scan produced alerts");
            }
            Ok(_) => {
                tracing::debug!("Due-date scan produced no new alerts");
            }
            Err(e) => {
                tracing::error!("Due-date scan failed: {}", e);
            }
        }
    }
}
