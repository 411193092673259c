//! Domain events reflecting campaign and funding state changes.
//!
//! Every committed mutation emits a [`FundingEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers.
//! Events are published only after the owning transaction has committed,
//! so subscribers never observe rolled-back state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{CampaignId, CampaignStatus, DonationId, RewardId};

/// Domain event emitted after every committed state mutation.
///
/// Amounts serialize as JSON strings to keep decimal precision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FundingEvent {
    /// A creator published a new campaign.
    CampaignCreated {
        /// Campaign identifier.
        campaign_id: CampaignId,
        /// Campaign title.
        title: String,
        /// Funding goal.
        goal_amount: Decimal,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A campaign was deleted together with its rewards.
    CampaignRemoved {
        /// Campaign identifier.
        campaign_id: CampaignId,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A donation was committed.
    DonationRecorded {
        /// Funded campaign.
        campaign_id: CampaignId,
        /// New donation record.
        donation_id: DonationId,
        /// Reward claimed, if any.
        reward_id: Option<RewardId>,
        /// Donated amount.
        amount: Decimal,
        /// Campaign total after the donation.
        current_amount: Decimal,
        /// Campaign goal.
        goal_amount: Decimal,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A campaign's lifecycle status changed (goal-crossing or expiry).
    StatusChanged {
        /// Campaign identifier.
        campaign_id: CampaignId,
        /// Status before the change.
        from: CampaignStatus,
        /// Status after the change.
        to: CampaignStatus,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The owner posted a progress update.
    UpdatePosted {
        /// Campaign identifier.
        campaign_id: CampaignId,
        /// Update body.
        text: String,
        /// Posting timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl FundingEvent {
    /// Returns the campaign this event belongs to.
    #[must_use]
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            Self::CampaignCreated { campaign_id, .. }
            | Self::CampaignRemoved { campaign_id, .. }
            | Self::DonationRecorded { campaign_id, .. }
            | Self::StatusChanged { campaign_id, .. }
            | Self::UpdatePosted { campaign_id, .. } => *campaign_id,
        }
    }

    /// Returns the event type discriminator string.
    #[must_use]
    pub fn event_type_str(&self) -> &'static str {
        match self {
            Self::CampaignCreated { .. } => "campaign_created",
            Self::CampaignRemoved { .. } => "campaign_removed",
            Self::DonationRecorded { .. } => "donation_recorded",
            Self::StatusChanged { .. } => "status_changed",
            Self::UpdatePosted { .. } => "update_posted",
        }
    }
}
