//! Campaign service: creation, listing, owner edits and lifecycle refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::auth::{Identity, Role};
use crate::domain::campaign::{DEFAULT_CAMPAIGN_IMAGE, SHORT_DESC_MAX_CHARS};
use crate::domain::reward::MAX_LIMITED_QUANTITY;
use crate::domain::{
    Campaign, CampaignCategory, CampaignId, CampaignStatus, CampaignUpdate, EventBus,
    FundingEvent, Reward, RewardId,
};
use crate::error::ApiError;
use crate::funding::StatusTransition;
use crate::funding::campaign_ledger;
use crate::persistence::{CampaignFilter, CampaignPage, CampaignPatch, FundingStore};

/// Creator input for a new campaign.
#[derive(Debug, Clone)]
pub struct CampaignDraft {
    /// Title.
    pub title: String,
    /// One-line pitch.
    pub short_desc: String,
    /// Full description.
    pub description: String,
    /// Category.
    pub category: CampaignCategory,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Deadline; must be in the future.
    pub deadline: DateTime<Utc>,
    /// Image reference; defaults to [`DEFAULT_CAMPAIGN_IMAGE`].
    pub image: Option<String>,
    /// Initial reward tiers.
    pub rewards: Vec<RewardDraft>,
}

/// Creator input for one reward tier.
#[derive(Debug, Clone)]
pub struct RewardDraft {
    /// Minimum qualifying donation.
    pub amount: Decimal,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Estimated delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Capacity; `None` for unlimited.
    pub limited_quantity: Option<u32>,
}

/// Campaign with its rewards, status refreshed on read.
#[derive(Debug, Clone)]
pub struct CampaignDetail {
    /// The campaign.
    pub campaign: Campaign,
    /// Its rewards, cheapest first.
    pub rewards: Vec<Reward>,
}

/// Orchestration layer for campaign content.
///
/// Funding fields are never written here; status changes go through
/// [`campaign_ledger`].
#[derive(Debug, Clone)]
pub struct CampaignService {
    store: Arc<dyn FundingStore>,
    event_bus: EventBus,
}

impl CampaignService {
    /// Creates a new `CampaignService`.
    #[must_use]
    pub fn new(store: Arc<dyn FundingStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Creates a campaign and its rewards for a Creator.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] without the Creator role,
    /// [`ApiError::InvalidRequest`] for invalid fields.
    pub async fn create(
        &self,
        caller: &Identity,
        draft: CampaignDraft,
    ) -> Result<CampaignDetail, ApiError> {
        caller.require(Role::Creator)?;
        let now = Utc::now();
        validate_draft(&draft, now)?;

        let campaign = Campaign {
            id: CampaignId::new(),
            title: draft.title.trim().to_string(),
            short_desc: draft.short_desc.trim().to_string(),
            description: draft.description,
            category: draft.category,
            creator_id: caller.user_id.clone(),
            image: draft
                .image
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CAMPAIGN_IMAGE.to_string()),
            goal_amount: draft.goal_amount,
            current_amount: Decimal::ZERO,
            deadline: draft.deadline,
            status: CampaignStatus::Active,
            updates: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut rewards: Vec<Reward> = draft
            .rewards
            .into_iter()
            .map(|r| Reward {
                id: RewardId::new(),
                campaign_id: campaign.id,
                amount: r.amount,
                title: r.title,
                description: r.description,
                estimated_delivery: r.estimated_delivery,
                limited_quantity: r.limited_quantity,
                quantity_claimed: 0,
                created_at: now,
            })
            .collect();
        self.store.insert_campaign(&campaign, &rewards).await?;
        rewards.sort_by(|a, b| a.amount.cmp(&b.amount));

        let _ = self.event_bus.publish(FundingEvent::CampaignCreated {
            campaign_id: campaign.id,
            title: campaign.title.clone(),
            goal_amount: campaign.goal_amount,
            timestamp: now,
        });
        tracing::info!(
            campaign_id = %campaign.id,
            creator = %campaign.creator_id,
            rewards = rewards.len(),
            "campaign created"
        );
        Ok(CampaignDetail { campaign, rewards })
    }

    /// Lists campaigns.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn list(&self, filter: &CampaignFilter) -> Result<CampaignPage, ApiError> {
        Ok(self.store.list_campaigns(filter).await?)
    }

    /// Returns a campaign with its rewards after refreshing its status.
    ///
    /// # Errors
    ///
    /// [`ApiError::CampaignNotFound`] if it does not exist.
    pub async fn detail(&self, id: CampaignId) -> Result<CampaignDetail, ApiError> {
        let refresh = campaign_ledger::refresh_lifecycle_status(self.store.as_ref(), id, Utc::now())
            .await?
            .ok_or_else(|| ApiError::CampaignNotFound(id.to_string()))?;
        if let Some(transition) = refresh.transition {
            self.publish_transition(transition);
        }
        let rewards = self.store.rewards_for_campaign(id).await?;
        Ok(CampaignDetail {
            campaign: refresh.campaign,
            rewards,
        })
    }

    /// Applies owner edits to content fields.
    ///
    /// # Errors
    ///
    /// [`ApiError::CampaignNotFound`], [`ApiError::Forbidden`] unless the
    /// caller is a Creator owning the campaign, or
    /// [`ApiError::InvalidRequest`] for an oversized short description.
    pub async fn update_content(
        &self,
        caller: &Identity,
        id: CampaignId,
        mut patch: CampaignPatch,
    ) -> Result<Campaign, ApiError> {
        caller.require(Role::Creator)?;
        self.owned_by(caller, id).await?;

        // blank fields leave the stored value untouched
        for field in [
            &mut patch.title,
            &mut patch.short_desc,
            &mut patch.description,
            &mut patch.image,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        if let Some(short_desc) = &patch.short_desc {
            check_short_desc(short_desc)?;
        }

        let campaign = self
            .store
            .update_campaign_content(id, &patch, Utc::now())
            .await?
            .ok_or_else(|| ApiError::CampaignNotFound(id.to_string()))?;
        tracing::info!(campaign_id = %id, "campaign content updated");
        Ok(campaign)
    }

    /// Deletes a campaign and its rewards. Donations are kept.
    ///
    /// # Errors
    ///
    /// [`ApiError::CampaignNotFound`], or [`ApiError::Forbidden`] unless the
    /// caller owns the campaign or is an Admin.
    pub async fn delete(&self, caller: &Identity, id: CampaignId) -> Result<(), ApiError> {
        let campaign = self.load(id).await?;
        if campaign.creator_id != caller.user_id && !caller.has_role(Role::Admin) {
            return Err(ApiError::Forbidden("not authorized to delete this campaign".to_string()));
        }
        if !self.store.delete_campaign(id).await? {
            return Err(ApiError::CampaignNotFound(id.to_string()));
        }
        let _ = self.event_bus.publish(FundingEvent::CampaignRemoved {
            campaign_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(campaign_id = %id, by = %caller.user_id, "campaign deleted");
        Ok(())
    }

    /// Appends a progress update.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for blank text,
    /// [`ApiError::CampaignNotFound`], or [`ApiError::Forbidden`] unless the
    /// caller is a Creator owning the campaign.
    pub async fn post_update(
        &self,
        caller: &Identity,
        id: CampaignId,
        text: &str,
    ) -> Result<Campaign, ApiError> {
        caller.require(Role::Creator)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidRequest("update text is required".to_string()));
        }
        self.owned_by(caller, id).await?;

        let update = CampaignUpdate {
            text: text.to_string(),
            posted_at: Utc::now(),
        };
        let campaign = self
            .store
            .append_campaign_update(id, &update)
            .await?
            .ok_or_else(|| ApiError::CampaignNotFound(id.to_string()))?;
        let _ = self.event_bus.publish(FundingEvent::UpdatePosted {
            campaign_id: id,
            text: update.text,
            timestamp: update.posted_at,
        });
        Ok(campaign)
    }

    /// Flips every expired `Active` campaign to its current status.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn sweep_expired(&self) -> Result<Vec<StatusTransition>, ApiError> {
        let transitions = campaign_ledger::sweep_expired(self.store.as_ref(), Utc::now()).await?;
        for transition in &transitions {
            self.publish_transition(*transition);
        }
        Ok(transitions)
    }

    async fn load(&self, id: CampaignId) -> Result<Campaign, ApiError> {
        self.store
            .campaign(id)
            .await?
            .ok_or_else(|| ApiError::CampaignNotFound(id.to_string()))
    }

    async fn owned_by(&self, caller: &Identity, id: CampaignId) -> Result<Campaign, ApiError> {
        let campaign = self.load(id).await?;
        if campaign.creator_id == caller.user_id {
            Ok(campaign)
        } else {
            Err(ApiError::Forbidden("not the owner of this campaign".to_string()))
        }
    }

    fn publish_transition(&self, transition: StatusTransition) {
        let _ = self.event_bus.publish(FundingEvent::StatusChanged {
            campaign_id: transition.campaign_id,
            from: transition.from,
            to: transition.to,
            timestamp: Utc::now(),
        });
    }
}

fn validate_draft(draft: &CampaignDraft, now: DateTime<Utc>) -> Result<(), ApiError> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::InvalidRequest("title is required".to_string()));
    }
    check_short_desc(&draft.short_desc)?;
    if draft.goal_amount < Decimal::ONE {
        return Err(ApiError::InvalidRequest("goalAmount must be at least 1".to_string()));
    }
    if draft.deadline <= now {
        return Err(ApiError::InvalidRequest("deadline must be in the future".to_string()));
    }
    for (idx, reward) in draft.rewards.iter().enumerate() {
        if reward.amount < Decimal::ONE {
            return Err(ApiError::InvalidRequest(format!(
                "rewards[{idx}].amount must be at least 1"
            )));
        }
        if reward.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest(format!("rewards[{idx}].title is required")));
        }
        if reward
            .limited_quantity
            .is_some_and(|q| q > MAX_LIMITED_QUANTITY)
        {
            return Err(ApiError::InvalidRequest(format!(
                "rewards[{idx}].limitedQuantity must be at most {MAX_LIMITED_QUANTITY}"
            )));
        }
    }
    Ok(())
}

fn check_short_desc(short_desc: &str) -> Result<(), ApiError> {
    if short_desc.chars().count() > SHORT_DESC_MAX_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "shortDesc must be at most {SHORT_DESC_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::persistence::MemoryStore;
    use crate::persistence::memory::tests::campaign;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn identity(id: &str, roles: &[Role]) -> Identity {
        Identity {
            user_id: UserId::new(id),
            roles: roles.to_vec(),
        }
    }

    fn draft() -> CampaignDraft {
        CampaignDraft {
            title: "  Community darkroom ".to_string(),
            short_desc: "Film lab for the neighbourhood".to_string(),
            description: "Enlargers, chemistry, a sink.".to_string(),
            category: CampaignCategory::Art,
            goal_amount: dec!(2500),
            deadline: Utc::now() + Duration::days(20),
            image: None,
            rewards: vec![
                RewardDraft {
                    amount: dec!(50),
                    title: "Darkroom pass".to_string(),
                    description: "Ten sessions".to_string(),
                    estimated_delivery: None,
                    limited_quantity: Some(20),
                },
                RewardDraft {
                    amount: dec!(10),
                    title: "Postcard".to_string(),
                    description: "Printed in the lab".to_string(),
                    estimated_delivery: None,
                    limited_quantity: None,
                },
            ],
        }
    }

    fn service() -> (MemoryStore, CampaignService) {
        let store = MemoryStore::new();
        let svc = CampaignService::new(Arc::new(store.clone()), EventBus::new(16));
        (store, svc)
    }

    #[tokio::test]
    async fn creator_creates_campaign_with_rewards() {
        let (_, svc) = service();
        let creator = identity("c-1", &[Role::Creator]);
        let Ok(detail) = svc.create(&creator, draft()).await else {
            panic!("create failed");
        };
        assert_eq!(detail.campaign.title, "Community darkroom");
        assert_eq!(detail.campaign.image, DEFAULT_CAMPAIGN_IMAGE);
        assert_eq!(detail.campaign.status, CampaignStatus::Active);
        assert_eq!(detail.campaign.current_amount, Decimal::ZERO);
        let minimums: Vec<Decimal> = detail.rewards.iter().map(|r| r.amount).collect();
        assert_eq!(minimums, vec![dec!(10), dec!(50)]);

        let Ok(fetched) = svc.detail(detail.campaign.id).await else {
            panic!("detail failed");
        };
        assert_eq!(fetched.rewards.len(), 2);
    }

    #[tokio::test]
    async fn create_requires_creator_and_valid_fields() {
        let (_, svc) = service();
        let backer = identity("b-1", &[Role::Backer]);
        assert!(matches!(svc.create(&backer, draft()).await, Err(ApiError::Forbidden(_))));

        let creator = identity("c-1", &[Role::Creator]);
        let mut past = draft();
        past.deadline = Utc::now() - Duration::hours(1);
        assert!(matches!(svc.create(&creator, past).await, Err(ApiError::InvalidRequest(_))));

        let mut long = draft();
        long.short_desc = "x".repeat(SHORT_DESC_MAX_CHARS + 1);
        assert!(matches!(svc.create(&creator, long).await, Err(ApiError::InvalidRequest(_))));

        let mut zero_goal = draft();
        zero_goal.goal_amount = Decimal::ZERO;
        assert!(matches!(
            svc.create(&creator, zero_goal).await,
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn reward_capacity_bounds() {
        let (_, svc) = service();
        let creator = identity("c-1", &[Role::Creator]);

        let mut oversized = draft();
        if let Some(r) = oversized.rewards.first_mut() {
            r.limited_quantity = Some(MAX_LIMITED_QUANTITY + 1);
        }
        assert!(matches!(
            svc.create(&creator, oversized).await,
            Err(ApiError::InvalidRequest(_))
        ));

        let mut largest = draft();
        if let Some(r) = largest.rewards.first_mut() {
            r.limited_quantity = Some(MAX_LIMITED_QUANTITY);
        }
        assert!(svc.create(&creator, largest).await.is_ok());

        let mut closed = draft();
        if let Some(r) = closed.rewards.first_mut() {
            r.limited_quantity = Some(0);
        }
        let Ok(detail) = svc.create(&creator, closed).await else {
            panic!("zero capacity tier should be accepted");
        };
        let sold_out: Vec<bool> = detail.rewards.iter().map(Reward::is_sold_out).collect();
        assert_eq!(sold_out, vec![false, true]);
    }

    #[tokio::test]
    async fn only_owner_edits_and_posts_updates() {
        let (store, svc) = service();
        let c = campaign(dec!(100));
        let _ = store.insert_campaign(&c, &[]).await;
        let owner = identity("creator-1", &[Role::Creator]);
        let stranger = identity("creator-2", &[Role::Creator]);

        let patch = CampaignPatch {
            title: Some("Solar kiln v2".to_string()),
            short_desc: Some(String::new()),
            ..CampaignPatch::default()
        };
        assert!(matches!(
            svc.update_content(&stranger, c.id, patch.clone()).await,
            Err(ApiError::Forbidden(_))
        ));
        let Ok(updated) = svc.update_content(&owner, c.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.title, "Solar kiln v2");
        assert_eq!(updated.short_desc, c.short_desc);

        assert!(matches!(
            svc.post_update(&owner, c.id, "   ").await,
            Err(ApiError::InvalidRequest(_))
        ));
        let Ok(with_update) = svc.post_update(&owner, c.id, "Prototype fired").await else {
            panic!("post_update failed");
        };
        assert_eq!(with_update.updates.len(), 1);
    }

    #[tokio::test]
    async fn delete_allowed_for_owner_or_admin() {
        let (store, svc) = service();
        let a = campaign(dec!(100));
        let b = campaign(dec!(100));
        let _ = store.insert_campaign(&a, &[]).await;
        let _ = store.insert_campaign(&b, &[]).await;

        let stranger = identity("someone", &[Role::Creator]);
        assert!(matches!(svc.delete(&stranger, a.id).await, Err(ApiError::Forbidden(_))));

        let owner = identity("creator-1", &[Role::Creator]);
        assert!(svc.delete(&owner, a.id).await.is_ok());
        assert!(matches!(svc.delete(&owner, a.id).await, Err(ApiError::CampaignNotFound(_))));

        let admin = identity("root", &[Role::Admin]);
        assert!(svc.delete(&admin, b.id).await.is_ok());
    }

    #[tokio::test]
    async fn detail_refreshes_expired_campaign() {
        let (store, svc) = service();
        let mut rx = svc.event_bus.subscribe();
        let mut c = campaign(dec!(100));
        c.deadline = Utc::now() - Duration::minutes(10);
        let _ = store.insert_campaign(&c, &[]).await;

        let Ok(detail) = svc.detail(c.id).await else {
            panic!("detail failed");
        };
        assert_eq!(detail.campaign.status, CampaignStatus::Failed);
        let Ok(event) = rx.recv().await else {
            panic!("expected status event");
        };
        assert_eq!(event.event_type_str(), "status_changed");

        assert!(matches!(
            svc.detail(CampaignId::new()).await,
            Err(ApiError::CampaignNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sweep_reports_transitions() {
        let (store, svc) = service();
        let mut c = campaign(dec!(100));
        c.deadline = Utc::now() - Duration::minutes(10);
        let _ = store.insert_campaign(&c, &[]).await;

        let Ok(transitions) = svc.sweep_expired().await else {
            panic!("sweep failed");
        };
        assert_eq!(transitions.len(), 1);
    }
}
