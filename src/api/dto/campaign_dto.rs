//! Campaign DTOs for create, list, detail and edit operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, clamp_page, default_limit, default_page};
use crate::domain::{
    Campaign, CampaignCategory, CampaignId, CampaignStatus, CampaignUpdate, Reward, RewardId,
    UserId,
};
use crate::error::ApiError;
use crate::persistence::{CampaignFilter, CampaignPatch, CampaignSort, SortOrder};
use crate::service::{CampaignDraft, RewardDraft};

/// Query string of `GET /campaigns`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CampaignListQuery {
    /// Category filter (e.g. `Tech`).
    pub category: Option<String>,
    /// Status filter (`Active`, `Funded`, `Failed`).
    pub status: Option<String>,
    /// Case-insensitive search on title and short description.
    pub search: Option<String>,
    /// Sort column. Defaults to `createdAt`.
    #[param(value_type = Option<String>)]
    pub sort_by: Option<CampaignSort>,
    /// `asc` or `desc`. Defaults to `desc`.
    #[param(value_type = Option<String>)]
    pub order: Option<SortOrder>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 10.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl CampaignListQuery {
    /// Converts the query into a store filter plus the clamped page and size.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for an unknown category or status.
    pub fn into_filter(self) -> Result<(CampaignFilter, u32, u32), ApiError> {
        let category = non_blank(self.category)
            .map(|c| c.parse::<CampaignCategory>())
            .transpose()
            .map_err(|c| ApiError::InvalidRequest(format!("unknown category {c}")))?;
        let status = non_blank(self.status)
            .map(|s| s.parse::<CampaignStatus>())
            .transpose()
            .map_err(|s| ApiError::InvalidRequest(format!("unknown status {s}")))?;
        let (page, limit, offset) = clamp_page(self.page, self.limit);
        let filter = CampaignFilter {
            category,
            status,
            search: non_blank(self.search),
            sort: self.sort_by.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
            offset,
            limit: u64::from(limit),
        };
        Ok((filter, page, limit))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Campaign as returned to clients, with display-derived fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDto {
    /// Campaign identifier.
    pub id: CampaignId,
    /// Title.
    pub title: String,
    /// One-line pitch.
    pub short_desc: String,
    /// Full description.
    pub description: String,
    /// Category.
    pub category: CampaignCategory,
    /// Owning creator.
    pub creator_id: UserId,
    /// Image reference.
    pub image: String,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Amount raised.
    pub current_amount: Decimal,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Progress updates, oldest first.
    pub updates: Vec<CampaignUpdate>,
    /// Percentage of the goal raised, capped at 100.
    pub percent_funded: u32,
    /// Whole days until the deadline.
    pub days_left: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl CampaignDto {
    /// Renders a campaign as seen at `now`.
    #[must_use]
    pub fn from_campaign(campaign: Campaign, now: DateTime<Utc>) -> Self {
        let percent_funded = campaign.percent_funded();
        let days_left = campaign.days_left(now);
        Self {
            id: campaign.id,
            title: campaign.title,
            short_desc: campaign.short_desc,
            description: campaign.description,
            category: campaign.category,
            creator_id: campaign.creator_id,
            image: campaign.image,
            goal_amount: campaign.goal_amount,
            current_amount: campaign.current_amount,
            deadline: campaign.deadline,
            status: campaign.status,
            updates: campaign.updates,
            percent_funded,
            days_left,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        }
    }
}

/// Reward tier as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardDto {
    /// Reward identifier.
    pub id: RewardId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Minimum qualifying donation.
    pub amount: Decimal,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Estimated delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Capacity; absent for unlimited.
    pub limited_quantity: Option<u32>,
    /// Units already claimed.
    pub quantity_claimed: u32,
    /// Whether a limited reward is fully claimed.
    pub is_sold_out: bool,
}

impl From<Reward> for RewardDto {
    fn from(reward: Reward) -> Self {
        let is_sold_out = reward.is_sold_out();
        Self {
            id: reward.id,
            campaign_id: reward.campaign_id,
            amount: reward.amount,
            title: reward.title,
            description: reward.description,
            estimated_delivery: reward.estimated_delivery,
            limited_quantity: reward.limited_quantity,
            quantity_claimed: reward.quantity_claimed,
            is_sold_out,
        }
    }
}

/// Response body for `GET /campaigns`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignListResponse {
    /// Campaigns on this page.
    pub campaigns: Vec<CampaignDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `GET /campaigns/{id}` and `POST /campaigns`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignDetailResponse {
    /// The campaign.
    pub campaign: CampaignDto,
    /// Its rewards, cheapest first.
    pub rewards: Vec<RewardDto>,
}

/// Response body for edits and update posts.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignMutationResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Campaign after the change.
    pub campaign: CampaignDto,
}

/// Reward tier in a create request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    /// Minimum qualifying donation.
    pub amount: Decimal,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Estimated delivery date.
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Capacity; omit for unlimited.
    #[serde(default)]
    pub limited_quantity: Option<u32>,
}

/// Request body for `POST /campaigns`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    /// Title.
    pub title: String,
    /// One-line pitch (max 200 characters).
    #[serde(default)]
    pub short_desc: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// Category name.
    pub category: String,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Deadline, must be in the future.
    pub deadline: DateTime<Utc>,
    /// Image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Initial reward tiers.
    #[serde(default)]
    pub rewards: Vec<CreateRewardRequest>,
}

impl TryFrom<CreateCampaignRequest> for CampaignDraft {
    type Error = ApiError;

    fn try_from(req: CreateCampaignRequest) -> Result<Self, Self::Error> {
        let category = req
            .category
            .parse()
            .map_err(|c| ApiError::InvalidRequest(format!("invalid category {c}")))?;
        Ok(Self {
            title: req.title,
            short_desc: req.short_desc,
            description: req.description,
            category,
            goal_amount: req.goal_amount,
            deadline: req.deadline,
            image: req.image,
            rewards: req
                .rewards
                .into_iter()
                .map(|r| RewardDraft {
                    amount: r.amount,
                    title: r.title,
                    description: r.description,
                    estimated_delivery: r.estimated_delivery,
                    limited_quantity: r.limited_quantity,
                })
                .collect(),
        })
    }
}

/// Request body for `PUT /campaigns/{id}`. Omitted fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    /// New title.
    pub title: Option<String>,
    /// New short description.
    pub short_desc: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category name.
    pub category: Option<String>,
    /// New image reference.
    pub image: Option<String>,
}

impl TryFrom<UpdateCampaignRequest> for CampaignPatch {
    type Error = ApiError;

    fn try_from(req: UpdateCampaignRequest) -> Result<Self, Self::Error> {
        let category = non_blank(req.category)
            .map(|c| c.parse::<CampaignCategory>())
            .transpose()
            .map_err(|c| ApiError::InvalidRequest(format!("invalid category {c}")))?;
        Ok(Self {
            title: req.title,
            short_desc: req.short_desc,
            description: req.description,
            category,
            image: req.image,
        })
    }
}

/// Request body for `POST /campaigns/{id}/updates`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostUpdateRequest {
    /// Update text.
    #[serde(default)]
    pub text: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn query(pairs: &str) -> CampaignListQuery {
        let Ok(q) = serde_json::from_str::<CampaignListQuery>(pairs) else {
            panic!("query should deserialize");
        };
        q
    }

    #[test]
    fn list_query_maps_to_filter() {
        let q = query(concat!(
            r#"{"category":"Tech","status":"Active","search":" kiln ","#,
            r#""sortBy":"goalAmount","order":"asc","page":3,"limit":5}"#,
        ));
        let Ok((filter, page, limit)) = q.into_filter() else {
            panic!("filter should build");
        };
        assert_eq!(filter.category, Some(CampaignCategory::Tech));
        assert_eq!(filter.status, Some(CampaignStatus::Active));
        assert_eq!(filter.search.as_deref(), Some("kiln"));
        assert_eq!(filter.sort, CampaignSort::GoalAmount);
        assert_eq!(filter.order, SortOrder::Asc);
        assert_eq!((page, limit, filter.offset, filter.limit), (3, 5, 10, 5));
    }

    #[test]
    fn list_query_defaults_and_rejects_unknown_category() {
        let Ok((filter, page, limit)) = query("{}").into_filter() else {
            panic!("filter should build");
        };
        assert_eq!((page, limit), (1, 10));
        assert_eq!(filter.sort, CampaignSort::CreatedAt);
        assert_eq!(filter.order, SortOrder::Desc);

        assert!(matches!(
            query(r#"{"category":"Gardening"}"#).into_filter(),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn reward_dto_flags_sold_out() {
        let reward = Reward {
            id: RewardId::new(),
            campaign_id: CampaignId::new(),
            amount: Decimal::TEN,
            title: "Tote".to_string(),
            description: String::new(),
            estimated_delivery: None,
            limited_quantity: Some(2),
            quantity_claimed: 2,
            created_at: Utc::now(),
        };
        let dto = RewardDto::from(reward);
        assert!(dto.is_sold_out);
        let Ok(json) = serde_json::to_value(&dto) else {
            panic!("serialize");
        };
        assert_eq!(json.get("isSoldOut"), Some(&serde_json::Value::Bool(true)));
    }
}
