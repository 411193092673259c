//! In-memory store with serialisable transactions.
//!
//! All state lives behind one [`tokio::sync::Mutex`]. A transaction holds
//! the lock for its whole lifetime and works on a staged copy of the
//! state; commit swaps the copy in, rollback or drop discards it. This
//! gives the same all-or-nothing and no-lost-update guarantees as the
//! PostgreSQL store, with every transaction fully serialised.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{CampaignFilter, CampaignPage, CampaignPatch, CampaignSort, SortOrder};
use super::{FundingStore, FundingTransaction, StoreError};
use crate::domain::{
    Campaign, CampaignId, CampaignStatus, CampaignUpdate, Donation, PaymentStatus, Reward,
    RewardId, UserId,
};
use crate::funding::LedgerWrite;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    campaigns: HashMap<CampaignId, Campaign>,
    rewards: HashMap<RewardId, Reward>,
    donations: Vec<Donation>,
}

/// Process-local [`FundingStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reward by id, outside any transaction.
    #[cfg(test)]
    pub(crate) async fn reward(&self, id: RewardId) -> Option<Reward> {
        self.state.lock().await.rewards.get(&id).cloned()
    }

    /// Returns the total number of stored donations.
    #[cfg(test)]
    pub(crate) async fn donation_count(&self) -> usize {
        self.state.lock().await.donations.len()
    }
}

#[async_trait]
impl FundingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn FundingTransaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        rewards: &[Reward],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.campaigns.insert(campaign.id, campaign.clone());
        for reward in rewards {
            state.rewards.insert(reward.id, reward.clone());
        }
        Ok(())
    }

    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
        Ok(self.state.lock().await.campaigns.get(&id).cloned())
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<CampaignPage, StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&Campaign> = state
            .campaigns
            .values()
            .filter(|c| filter.matches(c))
            .collect();
        matching.sort_by(|a, b| {
            let ord = compare_by(a, b, filter.sort).then_with(|| a.id.cmp(&b.id));
            match filter.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let total = matching.len() as u64;
        let campaigns = matching
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(CampaignPage { campaigns, total })
    }

    async fn update_campaign_content(
        &self,
        id: CampaignId,
        patch: &CampaignPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Campaign>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.campaigns.get_mut(&id).map(|campaign| {
            patch.apply(campaign, now);
            campaign.clone()
        }))
    }

    async fn append_campaign_update(
        &self,
        id: CampaignId,
        update: &CampaignUpdate,
    ) -> Result<Option<Campaign>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.campaigns.get_mut(&id).map(|campaign| {
            campaign.updates.push(update.clone());
            campaign.updated_at = update.posted_at;
            campaign.clone()
        }))
    }

    async fn delete_campaign(&self, id: CampaignId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let existed = state.campaigns.remove(&id).is_some();
        if existed {
            state.rewards.retain(|_, r| r.campaign_id != id);
        }
        Ok(existed)
    }

    async fn rewards_for_campaign(&self, id: CampaignId) -> Result<Vec<Reward>, StoreError> {
        let state = self.state.lock().await;
        let mut rewards: Vec<Reward> = state
            .rewards
            .values()
            .filter(|r| r.campaign_id == id)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| a.amount.cmp(&b.amount).then_with(|| a.id.cmp(&b.id)));
        Ok(rewards)
    }

    async fn donations_by_user(&self, user_id: &UserId) -> Result<Vec<Donation>, StoreError> {
        let state = self.state.lock().await;
        Ok(newest_first(
            state.donations.iter().filter(|d| &d.user_id == user_id),
        ))
    }

    async fn completed_donations_for_campaign(
        &self,
        id: CampaignId,
    ) -> Result<Vec<Donation>, StoreError> {
        let state = self.state.lock().await;
        Ok(newest_first(state.donations.iter().filter(|d| {
            d.campaign_id == id && d.payment_status == PaymentStatus::Completed
        })))
    }

    async fn expired_active_campaigns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CampaignId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .campaigns
            .values()
            .filter(|c| c.status == CampaignStatus::Active && c.deadline < now)
            .map(|c| c.id)
            .collect())
    }
}

/// Open transaction over a [`MemoryStore`].
#[derive(Debug)]
struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl FundingTransaction for MemoryTransaction {
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
        Ok(self.staged.campaigns.get(&id).cloned())
    }

    async fn lock_reward(&mut self, id: RewardId) -> Result<Option<Reward>, StoreError> {
        Ok(self.staged.rewards.get(&id).cloned())
    }

    async fn claim_reward_unit(
        &mut self,
        _write: &LedgerWrite,
        id: RewardId,
    ) -> Result<Option<u32>, StoreError> {
        let Some(reward) = self.staged.rewards.get_mut(&id) else {
            return Ok(None);
        };
        if reward.is_sold_out() {
            return Ok(None);
        }
        reward.quantity_claimed = reward.quantity_claimed.saturating_add(1);
        Ok(Some(reward.quantity_claimed))
    }

    async fn insert_donation(
        &mut self,
        _write: &LedgerWrite,
        donation: &Donation,
    ) -> Result<(), StoreError> {
        self.staged.donations.push(donation.clone());
        Ok(())
    }

    async fn store_funding(
        &mut self,
        _write: &LedgerWrite,
        id: CampaignId,
        current_amount: Decimal,
        status: CampaignStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let campaign = self
            .staged
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| StoreError::Decode(format!("campaign {id} vanished mid-transaction")))?;
        campaign.current_amount = current_amount;
        campaign.status = status;
        campaign.updated_at = now;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

fn compare_by(a: &Campaign, b: &Campaign, sort: CampaignSort) -> Ordering {
    match sort {
        CampaignSort::CreatedAt => a.created_at.cmp(&b.created_at),
        CampaignSort::Deadline => a.deadline.cmp(&b.deadline),
        CampaignSort::GoalAmount => a.goal_amount.cmp(&b.goal_amount),
        CampaignSort::CurrentAmount => a.current_amount.cmp(&b.current_amount),
    }
}

fn newest_first<'a>(donations: impl Iterator<Item = &'a Donation>) -> Vec<Donation> {
    let mut out: Vec<Donation> = donations.cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{CampaignCategory, DonationId};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    pub(crate) fn campaign(goal: Decimal) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: CampaignId::new(),
            title: "Solar kiln".to_string(),
            short_desc: "A kiln that runs on sunlight".to_string(),
            description: "Long form".to_string(),
            category: CampaignCategory::Tech,
            creator_id: UserId::new("creator-1"),
            image: "kiln.jpg".to_string(),
            goal_amount: goal,
            current_amount: Decimal::ZERO,
            deadline: now + Duration::days(30),
            status: CampaignStatus::Active,
            updates: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let c = campaign(dec!(100));
        let _ = store.insert_campaign(&c, &[]).await;

        {
            let Ok(mut tx) = store.begin().await else {
                panic!("begin failed");
            };
            let write = LedgerWrite::for_tests();
            let result = tx
                .store_funding(&write, c.id, dec!(50), CampaignStatus::Active, Utc::now())
                .await;
            assert!(result.is_ok());
        }

        let Ok(Some(after)) = store.campaign(c.id).await else {
            panic!("campaign missing");
        };
        assert_eq!(after.current_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let c = campaign(dec!(100));
        let _ = store.insert_campaign(&c, &[]).await;

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let write = LedgerWrite::for_tests();
        let donation = Donation {
            id: DonationId::new(),
            user_id: UserId::new("backer"),
            campaign_id: c.id,
            reward_id: None,
            amount: dec!(5),
            payment_status: PaymentStatus::Completed,
            created_at: Utc::now(),
        };
        assert!(tx.insert_donation(&write, &donation).await.is_ok());
        assert!(tx.commit().await.is_ok());

        assert_eq!(store.donation_count().await, 1);
        let Ok(mine) = store.donations_by_user(&UserId::new("backer")).await else {
            panic!("query failed");
        };
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_rewards_but_keeps_donations() {
        let store = MemoryStore::new();
        let c = campaign(dec!(100));
        let reward = Reward {
            id: RewardId::new(),
            campaign_id: c.id,
            amount: dec!(10),
            title: "Mug".to_string(),
            description: "Enamel mug".to_string(),
            estimated_delivery: None,
            limited_quantity: None,
            quantity_claimed: 0,
            created_at: Utc::now(),
        };
        let _ = store.insert_campaign(&c, std::slice::from_ref(&reward)).await;

        assert!(matches!(store.delete_campaign(c.id).await, Ok(true)));
        assert!(store.reward(reward.id).await.is_none());
        assert!(matches!(store.delete_campaign(c.id).await, Ok(false)));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for goal in [dec!(300), dec!(100), dec!(200)] {
            let _ = store.insert_campaign(&campaign(goal), &[]).await;
        }
        let mut art = campaign(dec!(50));
        art.category = CampaignCategory::Art;
        art.title = "Mural on Pier 4".to_string();
        let _ = store.insert_campaign(&art, &[]).await;

        let filter = CampaignFilter {
            category: Some(CampaignCategory::Tech),
            sort: CampaignSort::GoalAmount,
            order: SortOrder::Asc,
            offset: 1,
            limit: 1,
            ..CampaignFilter::default()
        };
        let Ok(page) = store.list_campaigns(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(page.total, 3);
        let goals: Vec<Decimal> = page.campaigns.iter().map(|c| c.goal_amount).collect();
        assert_eq!(goals, vec![dec!(200)]);

        let search = CampaignFilter {
            search: Some("pier".to_string()),
            limit: 10,
            ..CampaignFilter::default()
        };
        let Ok(found) = store.list_campaigns(&search).await else {
            panic!("list failed");
        };
        assert_eq!(found.total, 1);
    }
}
