//! Query models and database row types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;

use super::StoreError;
use crate::domain::{
    Campaign, CampaignCategory, CampaignId, CampaignStatus, CampaignUpdate, Donation, DonationId,
    PaymentStatus, Reward, RewardId, UserId,
};

/// Sortable campaign columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CampaignSort {
    /// Creation time.
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    /// Deadline.
    #[serde(rename = "deadline")]
    Deadline,
    /// Funding goal.
    #[serde(rename = "goalAmount")]
    GoalAmount,
    /// Amount raised.
    #[serde(rename = "currentAmount")]
    CurrentAmount,
}

impl CampaignSort {
    /// Column name in the `campaigns` table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Deadline => "deadline",
            Self::GoalAmount => "goal_amount",
            Self::CurrentAmount => "current_amount",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// Campaign listing filter with skip/limit pagination.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    /// Restrict to one category.
    pub category: Option<CampaignCategory>,
    /// Restrict to one status.
    pub status: Option<CampaignStatus>,
    /// Case-insensitive substring match on title or short description.
    pub search: Option<String>,
    /// Sort column.
    pub sort: CampaignSort,
    /// Sort direction.
    pub order: SortOrder,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return.
    pub limit: u64,
}

impl CampaignFilter {
    /// In-memory predicate equivalent to the SQL `WHERE` clause.
    #[must_use]
    pub fn matches(&self, campaign: &Campaign) -> bool {
        if self.category.is_some_and(|c| c != campaign.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != campaign.status) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase)
            && !campaign.title.to_lowercase().contains(&needle)
            && !campaign.short_desc.to_lowercase().contains(&needle)
        {
            return false;
        }
        true
    }
}

/// One page of campaigns.
#[derive(Debug, Clone, Default)]
pub struct CampaignPage {
    /// Campaigns on this page.
    pub campaigns: Vec<Campaign>,
    /// Total matching campaigns across all pages.
    pub total: u64,
}

/// Owner edits to campaign content. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignPatch {
    /// New title.
    pub title: Option<String>,
    /// New short description.
    pub short_desc: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<CampaignCategory>,
    /// New image reference.
    pub image: Option<String>,
}

impl CampaignPatch {
    /// Applies the patch to an in-memory campaign.
    pub fn apply(&self, campaign: &mut Campaign, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            campaign.title.clone_from(title);
        }
        if let Some(short_desc) = &self.short_desc {
            campaign.short_desc.clone_from(short_desc);
        }
        if let Some(description) = &self.description {
            campaign.description.clone_from(description);
        }
        if let Some(category) = self.category {
            campaign.category = category;
        }
        if let Some(image) = &self.image {
            campaign.image.clone_from(image);
        }
        campaign.updated_at = now;
    }
}

/// Row of the `campaigns` table.
#[derive(Debug, sqlx::FromRow)]
pub struct CampaignRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) short_desc: String,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) creator_id: String,
    pub(crate) image: String,
    pub(crate) goal_amount: Decimal,
    pub(crate) current_amount: Decimal,
    pub(crate) deadline: DateTime<Utc>,
    pub(crate) status: String,
    pub(crate) updates: Json<Vec<CampaignUpdate>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse()
            .map_err(|c| StoreError::Decode(format!("unknown category {c}")))?;
        let status = row
            .status
            .parse()
            .map_err(|s| StoreError::Decode(format!("unknown campaign status {s}")))?;
        Ok(Self {
            id: CampaignId::from_uuid(row.id),
            title: row.title,
            short_desc: row.short_desc,
            description: row.description,
            category,
            creator_id: UserId::new(row.creator_id),
            image: row.image,
            goal_amount: row.goal_amount,
            current_amount: row.current_amount,
            deadline: row.deadline,
            status,
            updates: row.updates.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of the `rewards` table.
#[derive(Debug, sqlx::FromRow)]
pub struct RewardRow {
    pub(crate) id: Uuid,
    pub(crate) campaign_id: Uuid,
    pub(crate) amount: Decimal,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) estimated_delivery: Option<DateTime<Utc>>,
    pub(crate) limited_quantity: Option<i32>,
    pub(crate) quantity_claimed: i32,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<RewardRow> for Reward {
    type Error = StoreError;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        let limited_quantity = row
            .limited_quantity
            .map(u32::try_from)
            .transpose()
            .map_err(|_| StoreError::Decode(format!("negative limit on reward {}", row.id)))?;
        let quantity_claimed = u32::try_from(row.quantity_claimed)
            .map_err(|_| StoreError::Decode(format!("negative claim count on reward {}", row.id)))?;
        Ok(Self {
            id: RewardId::from_uuid(row.id),
            campaign_id: CampaignId::from_uuid(row.campaign_id),
            amount: row.amount,
            title: row.title,
            description: row.description,
            estimated_delivery: row.estimated_delivery,
            limited_quantity,
            quantity_claimed,
            created_at: row.created_at,
        })
    }
}

/// Row of the `donations` table.
#[derive(Debug, sqlx::FromRow)]
pub struct DonationRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: String,
    pub(crate) campaign_id: Uuid,
    pub(crate) reward_id: Option<Uuid>,
    pub(crate) amount: Decimal,
    pub(crate) payment_status: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<DonationRow> for Donation {
    type Error = StoreError;

    fn try_from(row: DonationRow) -> Result<Self, Self::Error> {
        let payment_status: PaymentStatus = row
            .payment_status
            .parse()
            .map_err(|s| StoreError::Decode(format!("unknown payment status {s}")))?;
        Ok(Self {
            id: DonationId::from_uuid(row.id),
            user_id: UserId::new(row.user_id),
            campaign_id: CampaignId::from_uuid(row.campaign_id),
            reward_id: row.reward_id.map(RewardId::from_uuid),
            amount: row.amount,
            payment_status,
            created_at: row.created_at,
        })
    }
}
