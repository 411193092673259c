//! Reward tiers attached to a campaign.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CampaignId, RewardId};

/// Largest capacity a reward tier may declare; stored as a 32-bit signed
/// column.
pub const MAX_LIMITED_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// A reward tier a backer qualifies for by donating at least `amount`.
///
/// `quantity_claimed` is only ever incremented by the reward ledger inside
/// a donation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Reward identifier.
    pub id: RewardId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Minimum donation that qualifies for this reward.
    pub amount: Decimal,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Optional estimated delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Capacity; `None` means unlimited, `Some(0)` is sold out from the start.
    pub limited_quantity: Option<u32>,
    /// Units already claimed.
    pub quantity_claimed: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Reward {
    /// Returns `true` when a capacity is set and fully claimed.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.limited_quantity
            .is_some_and(|limit| self.quantity_claimed >= limit)
    }

    /// Units still available, or `None` for unlimited rewards.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.limited_quantity
            .map(|limit| limit.saturating_sub(self.quantity_claimed))
    }

    /// Returns `true` if `amount` meets this reward's minimum.
    #[must_use]
    pub fn covers(&self, amount: Decimal) -> bool {
        amount >= self.amount
    }
}
