//! Campaign funding ledger: raised amount and lifecycle status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::LedgerWrite;
use crate::domain::{Campaign, CampaignId, CampaignStatus};
use crate::error::ApiError;
use crate::persistence::{FundingStore, FundingTransaction};

/// Post-update funding figures returned to the donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingSnapshot {
    /// Campaign identifier.
    pub id: CampaignId,
    /// Campaign title.
    pub title: String,
    /// Amount raised after the update.
    pub current_amount: Decimal,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Status after the update.
    pub status: CampaignStatus,
}

/// A status change applied by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    /// Campaign whose status changed.
    pub campaign_id: CampaignId,
    /// Previous status.
    pub from: CampaignStatus,
    /// New status.
    pub to: CampaignStatus,
}

/// Result of [`apply_contribution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionOutcome {
    /// Funding figures after the contribution.
    pub snapshot: FundingSnapshot,
    /// `Some` when this contribution crossed the goal.
    pub transition: Option<StatusTransition>,
}

/// Result of [`refresh_lifecycle_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleRefresh {
    /// Campaign with its up-to-date status.
    pub campaign: Campaign,
    /// `Some` when the stored status was changed.
    pub transition: Option<StatusTransition>,
}

/// Rejects campaigns that may not take money at `now`.
///
/// # Errors
///
/// [`ApiError::CampaignNotAcceptingFunds`] unless the campaign is `Active`
/// with its deadline not yet passed.
pub fn ensure_accepting(campaign: &Campaign, now: DateTime<Utc>) -> Result<(), ApiError> {
    if campaign.accepts_funds_at(now) {
        Ok(())
    } else {
        Err(ApiError::CampaignNotAcceptingFunds(campaign.id))
    }
}

/// Adds `amount` to a campaign locked by `tx` and evaluates goal-crossing.
///
/// `campaign` must have been read through `tx` so the status check and the
/// increment see the same row version. `Funded` is terminal.
///
/// # Errors
///
/// [`ApiError::CampaignNotAcceptingFunds`] if the campaign is not open,
/// [`ApiError::InvalidAmount`] if the new total is not representable, or
/// a persistence error from the store.
pub async fn apply_contribution(
    tx: &mut dyn FundingTransaction,
    write: &LedgerWrite,
    campaign: &Campaign,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<ContributionOutcome, ApiError> {
    ensure_accepting(campaign, now)?;

    let Some(current_amount) = campaign.current_amount.checked_add(amount) else {
        tracing::warn!(
            campaign_id = %campaign.id,
            %amount,
            "contribution would overflow the campaign total"
        );
        return Err(ApiError::InvalidAmount);
    };
    let status = if current_amount >= campaign.goal_amount {
        CampaignStatus::Funded
    } else {
        CampaignStatus::Active
    };
    tx.store_funding(write, campaign.id, current_amount, status, now)
        .await?;

    let transition = (status != campaign.status).then_some(StatusTransition {
        campaign_id: campaign.id,
        from: campaign.status,
        to: status,
    });
    if transition.is_some() {
        tracing::info!(
            campaign_id = %campaign.id,
            %current_amount,
            goal = %campaign.goal_amount,
            "campaign reached its goal"
        );
    }

    Ok(ContributionOutcome {
        snapshot: FundingSnapshot {
            id: campaign.id,
            title: campaign.title.clone(),
            current_amount,
            goal_amount: campaign.goal_amount,
            status,
        },
        transition,
    })
}

/// Recomputes and persists the lifecycle status of one campaign.
///
/// Idempotent: writes only when the status actually changes. Returns
/// `None` if the campaign does not exist.
///
/// # Errors
///
/// Returns a persistence error if the store fails.
pub async fn refresh_lifecycle_status(
    store: &dyn FundingStore,
    campaign_id: CampaignId,
    now: DateTime<Utc>,
) -> Result<Option<LifecycleRefresh>, ApiError> {
    let mut tx = store.begin().await?;
    let Some(mut campaign) = tx.lock_campaign(campaign_id).await? else {
        tx.rollback().await?;
        return Ok(None);
    };

    let next = match campaign.status {
        CampaignStatus::Funded => CampaignStatus::Funded,
        _ => campaign.evaluate_status(now),
    };
    if next == campaign.status {
        tx.rollback().await?;
        return Ok(Some(LifecycleRefresh {
            campaign,
            transition: None,
        }));
    }

    let write = LedgerWrite::issue();
    tx.store_funding(&write, campaign.id, campaign.current_amount, next, now)
        .await?;
    tx.commit().await?;

    let transition = StatusTransition {
        campaign_id: campaign.id,
        from: campaign.status,
        to: next,
    };
    tracing::info!(
        %campaign_id,
        from = %transition.from,
        to = %transition.to,
        "campaign status refreshed"
    );
    campaign.status = next;
    campaign.updated_at = now;
    Ok(Some(LifecycleRefresh {
        campaign,
        transition: Some(transition),
    }))
}

/// Refreshes every campaign still stored as `Active` past its deadline.
///
/// Returns the transitions that were applied. Campaigns deleted between the
/// scan and the refresh are skipped.
///
/// # Errors
///
/// Returns a persistence error if the store fails.
pub async fn sweep_expired(
    store: &dyn FundingStore,
    now: DateTime<Utc>,
) -> Result<Vec<StatusTransition>, ApiError> {
    let mut transitions = Vec::new();
    for campaign_id in store.expired_active_campaigns(now).await? {
        if let Some(refresh) = refresh_lifecycle_status(store, campaign_id, now).await?
            && let Some(transition) = refresh.transition
        {
            transitions.push(transition);
        }
    }
    Ok(transitions)
}
