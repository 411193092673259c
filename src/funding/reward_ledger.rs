//! Reward ledger: claim capacity of reward tiers.
//!
//! The three steps run in the donation state-machine order: locate the
//! reward and check it belongs to the campaign, check the donation covers
//! its minimum, then reserve one unit.

use rust_decimal::Decimal;

use super::LedgerWrite;
use crate::domain::{CampaignId, Reward, RewardId};
use crate::error::ApiError;
use crate::persistence::FundingTransaction;

/// Loads and locks `reward_id`, rejecting rewards of another campaign.
///
/// # Errors
///
/// [`ApiError::RewardNotFound`] if the reward does not exist,
/// [`ApiError::RewardMismatch`] if it belongs to a different campaign.
pub async fn locate(
    tx: &mut dyn FundingTransaction,
    reward_id: RewardId,
    campaign_id: CampaignId,
) -> Result<Reward, ApiError> {
    let reward = tx
        .lock_reward(reward_id)
        .await?
        .ok_or_else(|| ApiError::RewardNotFound(reward_id.to_string()))?;
    if reward.campaign_id != campaign_id {
        return Err(ApiError::RewardMismatch {
            reward_id,
            campaign_id,
        });
    }
    Ok(reward)
}

/// Checks that `amount` qualifies for `reward`.
///
/// # Errors
///
/// [`ApiError::InsufficientAmount`] if `amount` is below the reward minimum.
pub fn validate_minimum(reward: &Reward, amount: Decimal) -> Result<(), ApiError> {
    if reward.covers(amount) {
        Ok(())
    } else {
        Err(ApiError::InsufficientAmount {
            minimum: reward.amount,
        })
    }
}

/// Reserves one unit of `reward` inside the caller's transaction.
///
/// The increment is conditional in the store as well, so a concurrent
/// claim that got there first makes this one fail instead of exceeding the
/// limit. Returns the new claimed count.
///
/// # Errors
///
/// [`ApiError::RewardExhausted`] when no unit is left, or a persistence
/// error from the store.
pub async fn reserve_unit(
    tx: &mut dyn FundingTransaction,
    write: &LedgerWrite,
    reward: &Reward,
) -> Result<u32, ApiError> {
    if reward.is_sold_out() {
        return Err(ApiError::RewardExhausted(reward.id));
    }
    let claimed = tx
        .claim_reward_unit(write, reward.id)
        .await?
        .ok_or(ApiError::RewardExhausted(reward.id))?;
    tracing::debug!(
        reward_id = %reward.id,
        claimed,
        limit = ?reward.limited_quantity,
        "reward unit reserved"
    );
    Ok(claimed)
}
