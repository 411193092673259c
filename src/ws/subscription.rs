//! Per-connection subscription manager.
//!
//! Tracks which campaigns a WebSocket client follows and filters funding
//! events server-side.

use std::collections::HashSet;

use crate::domain::CampaignId;

/// Campaign subscriptions of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed campaigns. Ignored while `subscribe_all` is set.
    campaign_ids: HashSet<CampaignId>,
    /// Wildcard `"*"` subscription.
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds campaigns to the set; `wildcard` enables `"*"`.
    pub fn subscribe(&mut self, ids: &[CampaignId], wildcard: bool) {
        self.subscribe_all |= wildcard;
        self.campaign_ids.extend(ids.iter().copied());
    }

    /// Removes campaigns from the set; `wildcard` disables `"*"`.
    pub fn unsubscribe(&mut self, ids: &[CampaignId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.campaign_ids.remove(id);
        }
    }

    /// Returns `true` if events of `campaign_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, campaign_id: CampaignId) -> bool {
        self.subscribe_all || self.campaign_ids.contains(&campaign_id)
    }

    /// Number of explicitly followed campaigns.
    #[must_use]
    pub fn count(&self) -> usize {
        self.campaign_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
