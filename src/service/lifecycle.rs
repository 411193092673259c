//! Periodic lifecycle sweep.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::CampaignService;

/// Spawns a task that runs [`CampaignService::sweep_expired`] every `period`.
///
/// Failures are logged and the next tick retries. The first sweep runs
/// immediately.
pub fn spawn_lifecycle_sweep(service: CampaignService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match service.sweep_expired().await {
                Ok(transitions) if !transitions.is_empty() => {
                    tracing::info!(count = transitions.len(), "lifecycle sweep closed campaigns");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "lifecycle sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::domain::{CampaignStatus, EventBus};
    use crate::persistence::memory::tests::campaign;
    use crate::persistence::{FundingStore, MemoryStore};

    #[tokio::test]
    async fn sweep_task_fails_expired_campaigns() {
        let store = MemoryStore::new();
        let mut c = campaign(dec!(100));
        c.deadline = Utc::now() - chrono::Duration::seconds(1);
        let _ = store.insert_campaign(&c, &[]).await;

        let service = CampaignService::new(Arc::new(store.clone()), EventBus::new(4));
        let handle = spawn_lifecycle_sweep(service, Duration::from_millis(20));

        let mut status = CampaignStatus::Active;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Ok(Some(current)) = store.campaign(c.id).await {
                status = current.status;
                if status == CampaignStatus::Failed {
                    break;
                }
            }
        }
        handle.abort();
        assert_eq!(status, CampaignStatus::Failed);
    }
}
