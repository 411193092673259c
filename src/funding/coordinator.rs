//! Donation transaction coordinator.
//!
//! The only entry point that creates [`Donation`] records. One request runs
//! the following steps inside a single store transaction:
//!
//! ```text
//! VALIDATE_INPUT -> LOAD_CAMPAIGN -> CHECK_CAMPAIGN_ACTIVE
//!   -> [reward] LOAD_REWARD -> CHECK_REWARD_BELONGS_TO_CAMPAIGN
//!   -> CHECK_REWARD_MINIMUM -> CHECK_REWARD_AVAILABLE -> RESERVE_REWARD_UNIT
//!   -> WRITE_DONATION -> APPLY_CONTRIBUTION -> EVALUATE_GOAL_CROSSING -> COMMIT
//! ```
//!
//! Any failure rolls the transaction back, so either every write happens or
//! none does. The attempt is bounded by a timeout; dropping the request
//! future before commit drops the transaction, which also rolls back.
//! Requests are not deduplicated: submitting the same request twice records
//! two donations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::campaign_ledger::{self, FundingSnapshot, StatusTransition};
use super::{LedgerWrite, reward_ledger};
use crate::domain::{
    CampaignId, Donation, DonationId, EventBus, FundingEvent, PaymentStatus, RewardId, UserId,
};
use crate::error::ApiError;
use crate::persistence::{FundingStore, FundingTransaction};

/// Raw donation request as received from a client.
#[derive(Debug, Clone)]
pub struct DonationRequest {
    /// Verified backer identity.
    pub backer: UserId,
    /// Donation amount; `None` when the client sent none or garbage.
    pub amount: Option<Decimal>,
    /// Campaign id as sent by the client.
    pub project_id: String,
    /// Reward id as sent by the client; blank means no reward.
    pub reward_id: Option<String>,
}

/// Request after the `VALIDATE_INPUT` step.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidDonation {
    backer: UserId,
    amount: Decimal,
    campaign_id: CampaignId,
    reward_id: Option<RewardId>,
}

impl DonationRequest {
    /// Smallest accepted donation.
    pub const MIN_AMOUNT: Decimal = Decimal::ONE;

    fn validate(self) -> Result<ValidDonation, ApiError> {
        let amount = self
            .amount
            .filter(|a| *a >= Self::MIN_AMOUNT)
            .ok_or(ApiError::InvalidAmount)?;
        let campaign_id = self
            .project_id
            .parse::<CampaignId>()
            .map_err(|_| ApiError::CampaignNotFound(self.project_id.clone()))?;
        let reward_id = match self.reward_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<RewardId>()
                    .map_err(|_| ApiError::RewardNotFound(raw.to_string()))?,
            ),
        };
        Ok(ValidDonation {
            backer: self.backer,
            amount,
            campaign_id,
            reward_id,
        })
    }
}

/// Successful donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationReceipt {
    /// The recorded donation.
    pub donation: Donation,
    /// Campaign funding after the donation.
    pub campaign: FundingSnapshot,
    /// `Some` when this donation crossed the campaign goal.
    pub transition: Option<StatusTransition>,
}

/// Runs donations as atomic store transactions and publishes the outcome.
#[derive(Debug, Clone)]
pub struct DonationCoordinator {
    store: Arc<dyn FundingStore>,
    event_bus: EventBus,
    tx_timeout: Duration,
}

impl DonationCoordinator {
    /// Creates a coordinator with the given transaction timeout.
    #[must_use]
    pub fn new(store: Arc<dyn FundingStore>, event_bus: EventBus, tx_timeout: Duration) -> Self {
        Self {
            store,
            event_bus,
            tx_timeout,
        }
    }

    /// Records one donation.
    ///
    /// # Errors
    ///
    /// One of the donation failures of [`ApiError`]: `InvalidAmount`,
    /// `CampaignNotFound`, `CampaignNotAcceptingFunds`, `RewardNotFound`,
    /// `RewardMismatch`, `InsufficientAmount`, `RewardExhausted`, or
    /// `TransactionAborted` for store failures and timeouts. No state is
    /// changed in any of these cases.
    pub async fn donate(&self, request: DonationRequest) -> Result<DonationReceipt, ApiError> {
        let input = request.validate()?;
        let campaign_id = input.campaign_id;

        let receipt = match tokio::time::timeout(self.tx_timeout, self.run(input)).await {
            Ok(result) => result.map_err(abort_on_store_failure)?,
            Err(_) => {
                tracing::warn!(
                    %campaign_id,
                    timeout = ?self.tx_timeout,
                    "donation transaction timed out"
                );
                return Err(ApiError::TransactionAborted);
            }
        };

        self.publish(&receipt);
        tracing::info!(
            donation_id = %receipt.donation.id,
            %campaign_id,
            amount = %receipt.donation.amount,
            current_amount = %receipt.campaign.current_amount,
            status = %receipt.campaign.status,
            "donation recorded"
        );
        Ok(receipt)
    }

    async fn run(&self, input: ValidDonation) -> Result<DonationReceipt, ApiError> {
        let mut tx = self.store.begin().await?;
        match apply(tx.as_mut(), &input, Utc::now()).await {
            Ok(receipt) => {
                tx.commit().await?;
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed; transaction dropped");
                }
                Err(err)
            }
        }
    }

    fn publish(&self, receipt: &DonationReceipt) {
        let now = Utc::now();
        let _ = self.event_bus.publish(FundingEvent::DonationRecorded {
            campaign_id: receipt.campaign.id,
            donation_id: receipt.donation.id,
            reward_id: receipt.donation.reward_id,
            amount: receipt.donation.amount,
            current_amount: receipt.campaign.current_amount,
            goal_amount: receipt.campaign.goal_amount,
            timestamp: now,
        });
        if let Some(transition) = receipt.transition {
            let _ = self.event_bus.publish(FundingEvent::StatusChanged {
                campaign_id: transition.campaign_id,
                from: transition.from,
                to: transition.to,
                timestamp: now,
            });
        }
    }
}

/// Steps `LOAD_CAMPAIGN` through `EVALUATE_GOAL_CROSSING`.
async fn apply(
    tx: &mut dyn FundingTransaction,
    input: &ValidDonation,
    now: DateTime<Utc>,
) -> Result<DonationReceipt, ApiError> {
    let write = LedgerWrite::issue();

    let campaign = tx
        .lock_campaign(input.campaign_id)
        .await?
        .ok_or_else(|| ApiError::CampaignNotFound(input.campaign_id.to_string()))?;
    campaign_ledger::ensure_accepting(&campaign, now)?;

    if let Some(reward_id) = input.reward_id {
        let reward = reward_ledger::locate(tx, reward_id, campaign.id).await?;
        reward_ledger::validate_minimum(&reward, input.amount)?;
        reward_ledger::reserve_unit(tx, &write, &reward).await?;
    }

    let donation = Donation {
        id: DonationId::new(),
        user_id: input.backer.clone(),
        campaign_id: campaign.id,
        reward_id: input.reward_id,
        amount: input.amount,
        payment_status: PaymentStatus::Completed,
        created_at: now,
    };
    tx.insert_donation(&write, &donation).await?;

    let outcome =
        campaign_ledger::apply_contribution(tx, &write, &campaign, input.amount, now).await?;

    Ok(DonationReceipt {
        donation,
        campaign: outcome.snapshot,
        transition: outcome.transition,
    })
}

/// Store failures inside the donation path surface as a retryable abort.
fn abort_on_store_failure(err: ApiError) -> ApiError {
    match err {
        ApiError::Persistence(store) => {
            tracing::warn!(error = %store, "donation transaction aborted by store");
            ApiError::TransactionAborted
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Campaign, CampaignStatus, Reward};
    use crate::persistence::memory::tests::campaign;
    use crate::persistence::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: MemoryStore,
        coordinator: DonationCoordinator,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let bus = EventBus::new(64);
        let coordinator = DonationCoordinator::new(
            Arc::new(store.clone()),
            bus.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            store,
            coordinator,
            bus,
        }
    }

    fn reward(
        campaign_id: CampaignId,
        minimum: Decimal,
        limit: Option<u32>,
        claimed: u32,
    ) -> Reward {
        Reward {
            id: RewardId::new(),
            campaign_id,
            amount: minimum,
            title: "Early bird".to_string(),
            description: "First batch shipment".to_string(),
            estimated_delivery: None,
            limited_quantity: limit,
            quantity_claimed: claimed,
            created_at: Utc::now(),
        }
    }

    fn request(
        campaign_id: CampaignId,
        amount: Decimal,
        reward_id: Option<RewardId>,
    ) -> DonationRequest {
        DonationRequest {
            backer: UserId::new("backer-7"),
            amount: Some(amount),
            project_id: campaign_id.to_string(),
            reward_id: reward_id.map(|r| r.to_string()),
        }
    }

    async fn stored(store: &MemoryStore, id: CampaignId) -> Campaign {
        let Ok(Some(c)) = store.campaign(id).await else {
            panic!("campaign {id} missing");
        };
        c
    }

    async fn assert_untouched(store: &MemoryStore, before: &Campaign, reward: Option<&Reward>) {
        let after = stored(store, before.id).await;
        assert_eq!(after.current_amount, before.current_amount);
        assert_eq!(after.status, before.status);
        assert_eq!(store.donation_count().await, 0);
        if let Some(reward) = reward {
            let Some(after) = store.reward(reward.id).await else {
                panic!("reward missing");
            };
            assert_eq!(after.quantity_claimed, reward.quantity_claimed);
        }
    }

    #[tokio::test]
    async fn goal_crossing_donation_funds_campaign() {
        let f = fixture();
        let mut rx = f.bus.subscribe();
        let mut c = campaign(dec!(1000));
        c.current_amount = dec!(900);
        let _ = f.store.insert_campaign(&c, &[]).await;

        let Ok(receipt) = f.coordinator.donate(request(c.id, dec!(150), None)).await else {
            panic!("donation failed");
        };
        assert_eq!(receipt.campaign.current_amount, dec!(1050));
        assert_eq!(receipt.campaign.status, CampaignStatus::Funded);
        assert_eq!(receipt.donation.payment_status, PaymentStatus::Completed);

        let after = stored(&f.store, c.id).await;
        assert_eq!(after.current_amount, dec!(1050));
        assert_eq!(after.status, CampaignStatus::Funded);

        let Ok(first) = rx.recv().await else {
            panic!("expected donation event");
        };
        assert_eq!(first.event_type_str(), "donation_recorded");
        let Ok(second) = rx.recv().await else {
            panic!("expected status event");
        };
        assert_eq!(second.event_type_str(), "status_changed");
    }

    #[tokio::test]
    async fn exhausted_reward_is_rejected_without_side_effects() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let r = reward(c.id, dec!(10), Some(1), 1);
        let _ = f.store.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let result = f.coordinator.donate(request(c.id, dec!(50), Some(r.id))).await;
        assert!(matches!(result, Err(ApiError::RewardExhausted(id)) if id == r.id));
        assert_untouched(&f.store, &c, Some(&r)).await;
    }

    #[tokio::test]
    async fn donation_below_reward_minimum_is_rejected() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let r = reward(c.id, dec!(10), Some(5), 0);
        let _ = f.store.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let result = f.coordinator.donate(request(c.id, dec!(5), Some(r.id))).await;
        assert!(matches!(
            result,
            Err(ApiError::InsufficientAmount { minimum }) if minimum == dec!(10)
        ));
        assert_untouched(&f.store, &c, Some(&r)).await;
    }

    #[tokio::test]
    async fn funded_campaign_refuses_donations() {
        let f = fixture();
        let mut c = campaign(dec!(100));
        c.current_amount = dec!(100);
        c.status = CampaignStatus::Funded;
        let _ = f.store.insert_campaign(&c, &[]).await;

        let result = f.coordinator.donate(request(c.id, dec!(20), None)).await;
        assert!(matches!(result, Err(ApiError::CampaignNotAcceptingFunds(id)) if id == c.id));
        assert_untouched(&f.store, &c, None).await;
    }

    #[tokio::test]
    async fn expired_but_unrefreshed_campaign_refuses_donations() {
        let f = fixture();
        let mut c = campaign(dec!(100));
        c.deadline = Utc::now() - ChronoDuration::minutes(1);
        let _ = f.store.insert_campaign(&c, &[]).await;

        let result = f.coordinator.donate(request(c.id, dec!(20), None)).await;
        assert!(matches!(result, Err(ApiError::CampaignNotAcceptingFunds(_))));
        assert_untouched(&f.store, &c, None).await;
    }

    #[tokio::test]
    async fn reward_of_another_campaign_is_a_mismatch() {
        let f = fixture();
        let target = campaign(dec!(1000));
        let other = campaign(dec!(1000));
        let r = reward(other.id, dec!(10), None, 0);
        let _ = f.store.insert_campaign(&target, &[]).await;
        let _ = f.store.insert_campaign(&other, std::slice::from_ref(&r)).await;

        let result = f.coordinator.donate(request(target.id, dec!(50), Some(r.id))).await;
        assert!(matches!(result, Err(ApiError::RewardMismatch { .. })));
        assert_untouched(&f.store, &target, Some(&r)).await;
    }

    #[tokio::test]
    async fn input_validation_failures() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let _ = f.store.insert_campaign(&c, &[]).await;

        for amount in [None, Some(dec!(0)), Some(dec!(-5)), Some(dec!(0.5))] {
            let mut req = request(c.id, dec!(1), None);
            req.amount = amount;
            let result = f.coordinator.donate(req).await;
            assert!(matches!(result, Err(ApiError::InvalidAmount)), "amount {amount:?}");
        }

        let mut bad_campaign = request(c.id, dec!(10), None);
        bad_campaign.project_id = "not-an-id".to_string();
        assert!(matches!(
            f.coordinator.donate(bad_campaign).await,
            Err(ApiError::CampaignNotFound(_))
        ));

        let missing = request(CampaignId::new(), dec!(10), None);
        assert!(matches!(
            f.coordinator.donate(missing).await,
            Err(ApiError::CampaignNotFound(_))
        ));

        let unknown_reward = request(c.id, dec!(10), Some(RewardId::new()));
        assert!(matches!(
            f.coordinator.donate(unknown_reward).await,
            Err(ApiError::RewardNotFound(_))
        ));

        assert_untouched(&f.store, &c, None).await;
    }

    #[tokio::test]
    async fn blank_reward_id_means_no_reward() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let _ = f.store.insert_campaign(&c, &[]).await;

        let mut req = request(c.id, dec!(10), None);
        req.reward_id = Some("  ".to_string());
        let Ok(receipt) = f.coordinator.donate(req).await else {
            panic!("donation failed");
        };
        assert_eq!(receipt.donation.reward_id, None);
    }

    #[tokio::test]
    async fn reward_donation_claims_one_unit() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let r = reward(c.id, dec!(25), Some(3), 1);
        let _ = f.store.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let Ok(receipt) = f.coordinator.donate(request(c.id, dec!(25), Some(r.id))).await else {
            panic!("donation failed");
        };
        assert_eq!(receipt.donation.reward_id, Some(r.id));
        let Some(after) = f.store.reward(r.id).await else {
            panic!("reward missing");
        };
        assert_eq!(after.quantity_claimed, 2);
        assert_eq!(stored(&f.store, c.id).await.current_amount, dec!(25));
    }

    #[tokio::test]
    async fn overflowing_total_rolls_back_reward_claim() {
        let f = fixture();
        let half = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);
        let c = campaign(Decimal::MAX);
        let r = reward(c.id, dec!(10), Some(3), 0);
        let _ = f.store.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let Ok(first) = f.coordinator.donate(request(c.id, half, None)).await else {
            panic!("first donation should fit");
        };
        assert_eq!(first.campaign.current_amount, half);

        let result = f.coordinator.donate(request(c.id, half, Some(r.id))).await;
        assert!(matches!(result, Err(ApiError::InvalidAmount)));

        assert_eq!(stored(&f.store, c.id).await.current_amount, half);
        assert_eq!(f.store.donation_count().await, 1);
        let Some(after) = f.store.reward(r.id).await else {
            panic!("reward missing");
        };
        assert_eq!(after.quantity_claimed, 0);
    }

    #[tokio::test]
    async fn identical_requests_are_not_deduplicated() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let _ = f.store.insert_campaign(&c, &[]).await;

        let req = request(c.id, dec!(40), None);
        assert!(f.coordinator.donate(req.clone()).await.is_ok());
        assert!(f.coordinator.donate(req).await.is_ok());

        assert_eq!(f.store.donation_count().await, 2);
        assert_eq!(stored(&f.store, c.id).await.current_amount, dec!(80));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_on_last_unit_yield_one_winner() {
        const ATTEMPTS: usize = 16;
        let f = fixture();
        let c = campaign(dec!(100_000));
        let r = reward(c.id, dec!(10), Some(1), 0);
        let _ = f.store.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let mut handles = Vec::with_capacity(ATTEMPTS);
        for _ in 0..ATTEMPTS {
            let coordinator = f.coordinator.clone();
            let req = request(c.id, dec!(10), Some(r.id));
            handles.push(tokio::spawn(async move { coordinator.donate(req).await }));
        }

        let mut won = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => won += 1,
                Ok(Err(ApiError::RewardExhausted(_))) => exhausted += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(exhausted, ATTEMPTS - 1);

        let Some(after) = f.store.reward(r.id).await else {
            panic!("reward missing");
        };
        assert_eq!(after.quantity_claimed, 1);
        assert_eq!(stored(&f.store, c.id).await.current_amount, dec!(10));
        assert_eq!(f.store.donation_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_donations_never_miss_goal_crossing() {
        let f = fixture();
        let mut c = campaign(dec!(1000));
        c.current_amount = dec!(950);
        let _ = f.store.insert_campaign(&c, &[]).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = f.coordinator.clone();
            let req = request(c.id, dec!(30), None);
            handles.push(tokio::spawn(async move { coordinator.donate(req).await }));
        }
        let mut accepted = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => accepted += 1,
                Ok(Err(ApiError::CampaignNotAcceptingFunds(_))) => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        // 950 + 30 = 980 stays active, the second donation crosses 1000
        assert_eq!(accepted, 2);
        let after = stored(&f.store, c.id).await;
        assert_eq!(after.current_amount, dec!(1010));
        assert_eq!(after.status, CampaignStatus::Funded);
    }

    /// Store whose transactions fail when writing the campaign total.
    #[derive(Debug, Clone)]
    struct FailingFundingStore {
        inner: MemoryStore,
    }

    struct FailingTransaction {
        inner: Box<dyn FundingTransaction>,
    }

    #[async_trait]
    impl FundingTransaction for FailingTransaction {
        async fn lock_campaign(&mut self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
            self.inner.lock_campaign(id).await
        }
        async fn lock_reward(&mut self, id: RewardId) -> Result<Option<Reward>, StoreError> {
            self.inner.lock_reward(id).await
        }
        async fn claim_reward_unit(
            &mut self,
            write: &LedgerWrite,
            id: RewardId,
        ) -> Result<Option<u32>, StoreError> {
            self.inner.claim_reward_unit(write, id).await
        }
        async fn insert_donation(
            &mut self,
            write: &LedgerWrite,
            donation: &Donation,
        ) -> Result<(), StoreError> {
            self.inner.insert_donation(write, donation).await
        }
        async fn store_funding(
            &mut self,
            _write: &LedgerWrite,
            _id: CampaignId,
            _current_amount: Decimal,
            _status: CampaignStatus,
            _now: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            self.inner.commit().await
        }
        async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
            self.inner.rollback().await
        }
    }

    #[async_trait]
    impl FundingStore for FailingFundingStore {
        async fn begin(&self) -> Result<Box<dyn FundingTransaction>, StoreError> {
            let inner = self.inner.begin().await?;
            Ok(Box::new(FailingTransaction { inner }))
        }
        async fn insert_campaign(&self, c: &Campaign, r: &[Reward]) -> Result<(), StoreError> {
            self.inner.insert_campaign(c, r).await
        }
        async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
            self.inner.campaign(id).await
        }
        async fn list_campaigns(
            &self,
            filter: &crate::persistence::CampaignFilter,
        ) -> Result<crate::persistence::CampaignPage, StoreError> {
            self.inner.list_campaigns(filter).await
        }
        async fn update_campaign_content(
            &self,
            id: CampaignId,
            patch: &crate::persistence::CampaignPatch,
            now: DateTime<Utc>,
        ) -> Result<Option<Campaign>, StoreError> {
            self.inner.update_campaign_content(id, patch, now).await
        }
        async fn append_campaign_update(
            &self,
            id: CampaignId,
            update: &crate::domain::CampaignUpdate,
        ) -> Result<Option<Campaign>, StoreError> {
            self.inner.append_campaign_update(id, update).await
        }
        async fn delete_campaign(&self, id: CampaignId) -> Result<bool, StoreError> {
            self.inner.delete_campaign(id).await
        }
        async fn rewards_for_campaign(&self, id: CampaignId) -> Result<Vec<Reward>, StoreError> {
            self.inner.rewards_for_campaign(id).await
        }
        async fn donations_by_user(&self, user_id: &UserId) -> Result<Vec<Donation>, StoreError> {
            self.inner.donations_by_user(user_id).await
        }
        async fn completed_donations_for_campaign(
            &self,
            id: CampaignId,
        ) -> Result<Vec<Donation>, StoreError> {
            self.inner.completed_donations_for_campaign(id).await
        }
        async fn expired_active_campaigns(
            &self,
            now: DateTime<Utc>,
        ) -> Result<Vec<CampaignId>, StoreError> {
            self.inner.expired_active_campaigns(now).await
        }
    }

    #[tokio::test]
    async fn store_failure_mid_flow_rolls_back_everything() {
        let inner = MemoryStore::new();
        let c = campaign(dec!(1000));
        let r = reward(c.id, dec!(10), Some(2), 0);
        let _ = inner.insert_campaign(&c, std::slice::from_ref(&r)).await;

        let coordinator = DonationCoordinator::new(
            Arc::new(FailingFundingStore {
                inner: inner.clone(),
            }),
            EventBus::new(8),
            Duration::from_secs(5),
        );
        let result = coordinator.donate(request(c.id, dec!(10), Some(r.id))).await;
        assert!(matches!(result, Err(ApiError::TransactionAborted)));
        assert_untouched(&inner, &c, Some(&r)).await;
    }

    #[tokio::test]
    async fn transaction_timeout_aborts_and_releases_store() {
        let f = fixture();
        let c = campaign(dec!(1000));
        let _ = f.store.insert_campaign(&c, &[]).await;

        // hold the store's only lock so the attempt cannot start in time
        let Ok(blocker) = f.store.begin().await else {
            panic!("begin failed");
        };
        let impatient = DonationCoordinator::new(
            Arc::new(f.store.clone()),
            f.bus.clone(),
            Duration::from_millis(50),
        );
        let result = impatient.donate(request(c.id, dec!(10), None)).await;
        assert!(matches!(result, Err(ApiError::TransactionAborted)));
        drop(blocker);

        assert!(f.coordinator.donate(request(c.id, dec!(10), None)).await.is_ok());
        assert_eq!(stored(&f.store, c.id).await.current_amount, dec!(10));
    }
}
