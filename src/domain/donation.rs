//! Donation records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CampaignId, DonationId, RewardId, UserId};

/// Payment state of a donation.
///
/// Donations are recorded as `Completed` synchronously; the other states
/// are reserved for a payment provider integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    /// Awaiting payment confirmation.
    Pending,
    /// Payment settled.
    Completed,
    /// Payment failed.
    Failed,
    /// Payment returned to the backer.
    Refunded,
}

impl PaymentStatus {
    /// Returns the canonical string form (e.g. `"Completed"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            other => Err(other.to_string()),
        }
    }
}

/// One backer's contribution to one campaign. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    /// Donation identifier.
    pub id: DonationId,
    /// Backer.
    pub user_id: UserId,
    /// Funded campaign.
    pub campaign_id: CampaignId,
    /// Reward claimed with this donation, if any.
    pub reward_id: Option<RewardId>,
    /// Donated amount.
    pub amount: Decimal,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a campaign's completed donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DonationStats {
    /// Sum of donated amounts.
    pub total_amount: Decimal,
    /// Number of donations.
    pub count: u64,
}

impl DonationStats {
    /// Folds a slice of donations into totals. The sum saturates at
    /// [`Decimal::MAX`].
    #[must_use]
    pub fn from_donations(donations: &[Donation]) -> Self {
        donations.iter().fold(Self::default(), |acc, d| Self {
            total_amount: acc.total_amount.saturating_add(d.amount),
            count: acc.count.saturating_add(1),
        })
    }
}
