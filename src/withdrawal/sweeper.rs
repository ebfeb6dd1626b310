//! Background job expiring stale approved withdrawals

use std::sync::Arc;
use std::time::Duration;

use crate::withdrawal::WithdrawalService;

/// Periodically moves APPROVED requests past the expiry window to EXPIRED
///
/// Refunds and notifications happen inside the service; this loop only
/// drives the sweep and logs.
pub async fn withdrawal_expiry_sweeper(service: Arc<WithdrawalService>) {
    tracing::info!("Starting withdrawal expiry sweeper");

    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;

        match service.expire_stale().await {
            Ok(expired) if !expired.is_empty() => {
                tracing::info!(count = expired.len(), "Expired stale withdrawals");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "Error expiring stale withdrawals");
            }
        }
    }
}
