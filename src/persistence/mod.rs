//! Persistence layer: campaign, reward and donation storage.
//!
//! [`FundingStore`] is the seam between services and storage. It exposes
//! plain reads and content writes directly, and opens a
//! [`FundingTransaction`] for the donation path. Two implementations exist:
//! [`postgres::PostgresStore`] backed by `sqlx::PgPool`, and
//! [`memory::MemoryStore`] for tests and database-less runs.
//!
//! Writes to funding fields (`current_amount`, `status`,
//! `quantity_claimed`) and donation inserts require a
//! [`LedgerWrite`] capability, which only [`crate::funding`] can mint.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use memory::MemoryStore;
pub use models::{CampaignFilter, CampaignPage, CampaignPatch, CampaignSort, SortOrder};
pub use postgres::PostgresStore;

use crate::domain::{
    Campaign, CampaignId, CampaignStatus, CampaignUpdate, Donation, Reward, RewardId, UserId,
};
use crate::funding::LedgerWrite;

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver error (connectivity, conflict, constraint).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Shared storage handle used by the services.
#[async_trait]
pub trait FundingStore: Send + Sync + std::fmt::Debug {
    /// Opens a transaction for the donation path.
    ///
    /// The transaction rolls back when dropped without [`FundingTransaction::commit`].
    async fn begin(&self) -> Result<Box<dyn FundingTransaction>, StoreError>;

    /// Inserts a campaign together with its initial rewards, atomically.
    async fn insert_campaign(&self, campaign: &Campaign, rewards: &[Reward])
    -> Result<(), StoreError>;

    /// Loads a campaign by id.
    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, StoreError>;

    /// Lists campaigns matching `filter`, with the unpaginated total.
    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<CampaignPage, StoreError>;

    /// Applies owner edits to content fields. Returns `None` if the campaign
    /// does not exist.
    async fn update_campaign_content(
        &self,
        id: CampaignId,
        patch: &CampaignPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Campaign>, StoreError>;

    /// Appends a progress update. Returns `None` if the campaign does not exist.
    async fn append_campaign_update(
        &self,
        id: CampaignId,
        update: &CampaignUpdate,
    ) -> Result<Option<Campaign>, StoreError>;

    /// Deletes a campaign and its rewards. Donations are left untouched.
    /// Returns `false` if the campaign did not exist.
    async fn delete_campaign(&self, id: CampaignId) -> Result<bool, StoreError>;

    /// Rewards of a campaign, cheapest first.
    async fn rewards_for_campaign(&self, id: CampaignId) -> Result<Vec<Reward>, StoreError>;

    /// A user's donations, newest first.
    async fn donations_by_user(&self, user_id: &UserId) -> Result<Vec<Donation>, StoreError>;

    /// Completed donations of a campaign, newest first.
    async fn completed_donations_for_campaign(
        &self,
        id: CampaignId,
    ) -> Result<Vec<Donation>, StoreError>;

    /// Ids of campaigns still stored as `Active` whose deadline is before `now`.
    async fn expired_active_campaigns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CampaignId>, StoreError>;
}

/// One open store transaction.
///
/// Reads lock the returned rows until commit or rollback, so two
/// transactions touching the same campaign or reward are serialised.
#[async_trait]
pub trait FundingTransaction: Send {
    /// Loads and locks a campaign.
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Option<Campaign>, StoreError>;

    /// Loads and locks a reward.
    async fn lock_reward(&mut self, id: RewardId) -> Result<Option<Reward>, StoreError>;

    /// Increments `quantity_claimed` by one unless that would exceed the
    /// limit. Returns the new count, or `None` when the reward is
    /// exhausted or missing.
    async fn claim_reward_unit(
        &mut self,
        write: &LedgerWrite,
        id: RewardId,
    ) -> Result<Option<u32>, StoreError>;

    /// Inserts a donation record.
    async fn insert_donation(
        &mut self,
        write: &LedgerWrite,
        donation: &Donation,
    ) -> Result<(), StoreError>;

    /// Stores a campaign's funding total and status.
    async fn store_funding(
        &mut self,
        write: &LedgerWrite,
        id: CampaignId,
        current_amount: Decimal,
        status: CampaignStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Makes every write of this transaction durable and visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
