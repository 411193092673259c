//! PostgreSQL implementation of the persistence layer.
//!
//! Donation transactions lock the campaign row before the reward row
//! (`SELECT ... FOR UPDATE`, always in that order) and claim reward units
//! with a conditional `UPDATE`, so concurrent donations cannot over-claim
//! a limited reward or lose a goal-crossing update.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::models::{
    CampaignFilter, CampaignPage, CampaignPatch, CampaignRow, DonationRow, RewardRow, SortOrder,
};
use super::{FundingStore, FundingTransaction, StoreError};
use crate::config::GatewayConfig;
use crate::domain::{
    Campaign, CampaignId, CampaignStatus, CampaignUpdate, Donation, PaymentStatus, Reward,
    RewardId, UserId,
};
use crate::funding::LedgerWrite;

const CAMPAIGN_COLUMNS: &str = "id, title, short_desc, description, category, creator_id, image, \
     goal_amount, current_amount, deadline, status, updates, created_at, updated_at";

const REWARD_COLUMNS: &str = "id, campaign_id, amount, title, description, estimated_delivery, \
     limited_quantity, quantity_claimed, created_at";

const DONATION_COLUMNS: &str =
    "id, user_id, campaign_id, reward_id, amount, payment_status, created_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migrate`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn limit_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CampaignFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR short_desc ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl FundingStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn FundingTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgFundingTransaction { tx }))
    }

    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        rewards: &[Reward],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO campaigns (id, title, short_desc, description, category, creator_id, \
             image, goal_amount, current_amount, deadline, status, updates, created_at, \
             updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(*campaign.id.as_uuid())
        .bind(&campaign.title)
        .bind(&campaign.short_desc)
        .bind(&campaign.description)
        .bind(campaign.category.as_str())
        .bind(campaign.creator_id.as_str())
        .bind(&campaign.image)
        .bind(campaign.goal_amount)
        .bind(campaign.current_amount)
        .bind(campaign.deadline)
        .bind(campaign.status.as_str())
        .bind(Json(&campaign.updates))
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await?;

        for reward in rewards {
            let limit = reward
                .limited_quantity
                .map(i32::try_from)
                .transpose()
                .map_err(|_| {
                    StoreError::Decode(format!("reward {} capacity out of range", reward.id))
                })?;
            sqlx::query(
                "INSERT INTO rewards (id, campaign_id, amount, title, description, \
                 estimated_delivery, limited_quantity, quantity_claimed, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)",
            )
            .bind(*reward.id.as_uuid())
            .bind(*reward.campaign_id.as_uuid())
            .bind(reward.amount)
            .bind(&reward.title)
            .bind(&reward.description)
            .bind(reward.estimated_delivery)
            .bind(limit)
            .bind(reward.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<CampaignPage, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns"));
        push_filter(&mut select, filter);
        let direction = match filter.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        select
            .push(format!(
                " ORDER BY {} {direction}, id {direction}",
                filter.sort.column()
            ))
            .push(" OFFSET ")
            .push_bind(limit_to_i64(filter.offset))
            .push(" LIMIT ")
            .push_bind(limit_to_i64(filter.limit));
        let rows: Vec<CampaignRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(CampaignPage {
            campaigns: decode_all(rows)?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn update_campaign_content(
        &self,
        id: CampaignId,
        patch: &CampaignPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "UPDATE campaigns SET \
             title = COALESCE($2, title), \
             short_desc = COALESCE($3, short_desc), \
             description = COALESCE($4, description), \
             category = COALESCE($5, category), \
             image = COALESCE($6, image), \
             updated_at = $7 \
             WHERE id = $1 RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(patch.title.as_deref())
        .bind(patch.short_desc.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.category.map(|c| c.as_str()))
        .bind(patch.image.as_deref())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn append_campaign_update(
        &self,
        id: CampaignId,
        update: &CampaignUpdate,
    ) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "UPDATE campaigns SET updates = updates || $2, updated_at = $3 \
             WHERE id = $1 RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(Json(vec![update]))
        .bind(update.posted_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn delete_campaign(&self, id: CampaignId) -> Result<bool, StoreError> {
        // rewards cascade through the foreign key
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rewards_for_campaign(&self, id: CampaignId) -> Result<Vec<Reward>, StoreError> {
        let rows = sqlx::query_as::<_, RewardRow>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE campaign_id = $1 \
             ORDER BY amount ASC, id ASC"
        ))
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn donations_by_user(&self, user_id: &UserId) -> Result<Vec<Donation>, StoreError> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn completed_donations_for_campaign(
        &self,
        id: CampaignId,
    ) -> Result<Vec<Donation>, StoreError> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations \
             WHERE campaign_id = $1 AND payment_status = $2 ORDER BY created_at DESC"
        ))
        .bind(*id.as_uuid())
        .bind(PaymentStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn expired_active_campaigns(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CampaignId>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM campaigns WHERE status = $1 AND deadline < $2",
        )
        .bind(CampaignStatus::Active.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(CampaignId::from_uuid).collect())
    }
}

/// Open PostgreSQL transaction. Rolled back by `sqlx` when dropped.
struct PgFundingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FundingTransaction for PgFundingTransaction {
    async fn lock_campaign(&mut self, id: CampaignId) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Campaign::try_from).transpose()
    }

    async fn lock_reward(&mut self, id: RewardId) -> Result<Option<Reward>, StoreError> {
        let row = sqlx::query_as::<_, RewardRow>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Reward::try_from).transpose()
    }

    async fn claim_reward_unit(
        &mut self,
        _write: &LedgerWrite,
        id: RewardId,
    ) -> Result<Option<u32>, StoreError> {
        let claimed = sqlx::query_scalar::<_, i32>(
            "UPDATE rewards SET quantity_claimed = quantity_claimed + 1 \
             WHERE id = $1 AND (limited_quantity IS NULL OR quantity_claimed < limited_quantity) \
             RETURNING quantity_claimed",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(claimed.and_then(|q| u32::try_from(q).ok()))
    }

    async fn insert_donation(
        &mut self,
        _write: &LedgerWrite,
        donation: &Donation,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO donations \
             (id, user_id, campaign_id, reward_id, amount, payment_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*donation.id.as_uuid())
        .bind(donation.user_id.as_str())
        .bind(*donation.campaign_id.as_uuid())
        .bind(donation.reward_id.map(Uuid::from))
        .bind(donation.amount)
        .bind(donation.payment_status.as_str())
        .bind(donation.created_at)
        .execute(&mut *self.tx)
        .await?;
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
        sqlx::query(
            "UPDATE campaigns SET current_amount = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(current_amount)
        .bind(status.as_str())
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
