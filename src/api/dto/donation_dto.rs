//! Donation DTOs.
//!
//! The request keeps `amount` as a raw JSON value so that a missing,
//! non-numeric or non-positive amount surfaces as `InvalidAmount` rather
//! than a generic body rejection.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    CampaignId, CampaignStatus, Donation, DonationId, DonationStats, PaymentStatus, RewardId,
    UserId,
};
use crate::funding::{DonationReceipt, DonationRequest, FundingSnapshot};

/// Request body for `POST /donations`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    /// Amount as a JSON number or numeric string.
    #[schema(value_type = String, example = "25.00")]
    pub amount: Option<serde_json::Value>,
    /// Campaign to fund.
    #[serde(default)]
    pub project_id: String,
    /// Optional reward to claim.
    #[serde(default)]
    pub reward_id: Option<String>,
}

impl CreateDonationRequest {
    /// Attaches the verified backer.
    #[must_use]
    pub fn into_request(self, backer: UserId) -> DonationRequest {
        DonationRequest {
            backer,
            amount: self.amount.as_ref().and_then(parse_amount),
            project_id: self.project_id,
            reward_id: self.reward_id,
        }
    }
}

/// Reads a decimal from a JSON number or string; anything else is `None`.
fn parse_amount(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Donation as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationDto {
    /// Donation identifier.
    pub id: DonationId,
    /// Backer.
    pub user_id: UserId,
    /// Funded campaign.
    pub project_id: CampaignId,
    /// Claimed reward.
    pub reward_id: Option<RewardId>,
    /// Donated amount.
    pub amount: Decimal,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Donation> for DonationDto {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            project_id: d.campaign_id,
            reward_id: d.reward_id,
            amount: d.amount,
            payment_status: d.payment_status,
            created_at: d.created_at,
        }
    }
}

/// Campaign funding after a donation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundedProjectDto {
    /// Campaign identifier.
    pub id: CampaignId,
    /// Title.
    pub title: String,
    /// Amount raised.
    pub current_amount: Decimal,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Status after the donation.
    pub status: CampaignStatus,
}

impl From<FundingSnapshot> for FundedProjectDto {
    fn from(s: FundingSnapshot) -> Self {
        Self {
            id: s.id,
            title: s.title,
            current_amount: s.current_amount,
            goal_amount: s.goal_amount,
            status: s.status,
        }
    }
}

/// Response body for `POST /donations` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct DonationResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The recorded donation.
    pub donation: DonationDto,
    /// Campaign funding after the donation.
    pub project: FundedProjectDto,
}

impl From<DonationReceipt> for DonationResponse {
    fn from(receipt: DonationReceipt) -> Self {
        Self {
            message: "Donation successful".to_string(),
            donation: receipt.donation.into(),
            project: receipt.campaign.into(),
        }
    }
}

/// Totals over a campaign's completed donations.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationStatsDto {
    /// Sum of amounts.
    pub total_amount: Decimal,
    /// Number of donations.
    pub count: u64,
}

impl From<DonationStats> for DonationStatsDto {
    fn from(s: DonationStats) -> Self {
        Self {
            total_amount: s.total_amount,
            count: s.count,
        }
    }
}

/// Response body for `GET /donations/campaign/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignDonationsResponse {
    /// Completed donations, newest first.
    pub donations: Vec<DonationDto>,
    /// Totals.
    pub stats: DonationStatsDto,
}
