//! Donation service: the donate entry point and donation history reads.

use std::sync::Arc;

use crate::auth::Identity;
use crate::domain::{CampaignId, Donation, DonationStats};
use crate::error::ApiError;
use crate::funding::{DonationCoordinator, DonationReceipt, DonationRequest};
use crate::persistence::FundingStore;

/// Completed donations of one campaign with their totals.
#[derive(Debug, Clone)]
pub struct CampaignDonations {
    /// Donations, newest first.
    pub donations: Vec<Donation>,
    /// Sum and count over `donations`.
    pub stats: DonationStats,
}

/// Thin layer over the [`DonationCoordinator`] plus read-only queries.
#[derive(Debug, Clone)]
pub struct DonationService {
    store: Arc<dyn FundingStore>,
    coordinator: DonationCoordinator,
}

impl DonationService {
    /// Creates a new `DonationService`.
    #[must_use]
    pub fn new(store: Arc<dyn FundingStore>, coordinator: DonationCoordinator) -> Self {
        Self { store, coordinator }
    }

    /// Records a donation for the caller.
    ///
    /// # Errors
    ///
    /// See [`DonationCoordinator::donate`].
    pub async fn donate(&self, request: DonationRequest) -> Result<DonationReceipt, ApiError> {
        self.coordinator.donate(request).await
    }

    /// The caller's donations, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn my_donations(&self, caller: &Identity) -> Result<Vec<Donation>, ApiError> {
        Ok(self.store.donations_by_user(&caller.user_id).await?)
    }

    /// Completed donations of a campaign. Donations outlive their campaign,
    /// so an unknown id yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn campaign_donations(&self, id: CampaignId) -> Result<CampaignDonations, ApiError> {
        let donations = self.store.completed_donations_for_campaign(id).await?;
        let stats = DonationStats::from_donations(&donations);
        Ok(CampaignDonations { donations, stats })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::domain::{EventBus, UserId};
    use crate::persistence::MemoryStore;
    use crate::persistence::memory::tests::campaign;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn service(store: &MemoryStore) -> DonationService {
        let shared: Arc<dyn FundingStore> = Arc::new(store.clone());
        let coordinator =
            DonationCoordinator::new(Arc::clone(&shared), EventBus::new(8), Duration::from_secs(5));
        DonationService::new(shared, coordinator)
    }

    fn donation_for(
        user: &str,
        campaign_id: CampaignId,
        amount: rust_decimal::Decimal,
    ) -> DonationRequest {
        DonationRequest {
            backer: UserId::new(user),
            amount: Some(amount),
            project_id: campaign_id.to_string(),
            reward_id: None,
        }
    }

    #[tokio::test]
    async fn history_and_stats_follow_recorded_donations() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let c = campaign(dec!(1000));
        let _ = store.insert_campaign(&c, &[]).await;

        for (user, amount) in [("ana", dec!(10)), ("ana", dec!(15)), ("ben", dec!(40))] {
            assert!(svc.donate(donation_for(user, c.id, amount)).await.is_ok());
        }

        let ana = Identity {
            user_id: UserId::new("ana"),
            roles: vec![Role::Backer],
        };
        let Ok(mine) = svc.my_donations(&ana).await else {
            panic!("history failed");
        };
        assert_eq!(mine.len(), 2);
        assert!(
            mine.windows(2)
                .all(|w| matches!(w, [a, b] if a.created_at >= b.created_at))
        );

        let Ok(all) = svc.campaign_donations(c.id).await else {
            panic!("campaign donations failed");
        };
        assert_eq!(all.stats.count, 3);
        assert_eq!(all.stats.total_amount, dec!(65));

        let Ok(none) = svc.campaign_donations(CampaignId::new()).await else {
            panic!("campaign donations failed");
        };
        assert!(none.donations.is_empty());
    }
}
