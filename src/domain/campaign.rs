//! Funding campaign aggregate and its lifecycle rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CampaignId, UserId};

/// Image reference used when a campaign is created without one.
pub const DEFAULT_CAMPAIGN_IMAGE: &str = "default-project.jpg";

/// Maximum length of a campaign's short description, in characters.
pub const SHORT_DESC_MAX_CHARS: usize = 200;

/// Closed set of campaign categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CampaignCategory {
    /// Technology and gadgets.
    Tech,
    /// Visual and performing arts.
    Art,
    /// Charitable causes.
    Charity,
    /// Music projects.
    Music,
    /// Food and drink.
    Food,
    /// Tabletop and video games.
    Games,
    /// Film and video.
    Film,
    /// Books and publishing.
    Publishing,
    /// Anything else.
    Other,
}

impl CampaignCategory {
    /// All categories in display order.
    pub const ALL: [Self; 9] = [
        Self::Tech,
        Self::Art,
        Self::Charity,
        Self::Music,
        Self::Food,
        Self::Games,
        Self::Film,
        Self::Publishing,
        Self::Other,
    ];

    /// Returns the canonical string form (e.g. `"Tech"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tech => "Tech",
            Self::Art => "Art",
            Self::Charity => "Charity",
            Self::Music => "Music",
            Self::Food => "Food",
            Self::Games => "Games",
            Self::Film => "Film",
            Self::Publishing => "Publishing",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for CampaignCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CampaignStatus {
    /// Accepting donations.
    Active,
    /// Goal reached. Terminal.
    Funded,
    /// Deadline passed without reaching the goal.
    Failed,
}

impl CampaignStatus {
    /// Returns the canonical string form (e.g. `"Active"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Funded => "Funded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Funded" => Ok(Self::Funded),
            "Failed" => Ok(Self::Failed),
            other => Err(other.to_string()),
        }
    }
}

/// A progress note posted by the campaign owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    /// Update body.
    pub text: String,
    /// When the update was posted.
    pub posted_at: DateTime<Utc>,
}

/// A funding campaign.
///
/// `current_amount` and `status` are owned by the funding ledgers in
/// [`crate::funding`]; every other field is content edited by the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identifier (immutable after creation).
    pub id: CampaignId,
    /// Display title.
    pub title: String,
    /// One-line pitch, at most [`SHORT_DESC_MAX_CHARS`] characters.
    pub short_desc: String,
    /// Full description.
    pub description: String,
    /// Category.
    pub category: CampaignCategory,
    /// Owning creator.
    pub creator_id: UserId,
    /// Opaque image reference.
    pub image: String,
    /// Funding goal.
    pub goal_amount: Decimal,
    /// Amount raised so far.
    pub current_amount: Decimal,
    /// Funding deadline.
    pub deadline: DateTime<Utc>,
    /// Lifecycle status as of the last evaluation.
    pub status: CampaignStatus,
    /// Owner-authored progress notes, oldest first.
    pub updates: Vec<CampaignUpdate>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Returns `true` once the raised amount has reached the goal.
    #[must_use]
    pub fn goal_reached(&self) -> bool {
        self.current_amount >= self.goal_amount
    }

    /// Evaluates the lifecycle status this campaign should have at `now`.
    #[must_use]
    pub fn evaluate_status(&self, now: DateTime<Utc>) -> CampaignStatus {
        evaluate_status(self.current_amount, self.goal_amount, self.deadline, now)
    }

    /// Returns `true` if a donation may be applied at `now`.
    ///
    /// A campaign whose stored status is still `Active` but whose deadline
    /// has passed is treated as closed even before the status is persisted.
    #[must_use]
    pub fn accepts_funds_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active && now <= self.deadline
    }

    /// Percentage of the goal raised, rounded and capped at 100.
    #[must_use]
    pub fn percent_funded(&self) -> u32 {
        percent_funded(self.current_amount, self.goal_amount)
    }

    /// Whole days remaining until the deadline, never negative.
    #[must_use]
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        days_left(self.deadline, now)
    }
}

/// Lifecycle rule shared by the read path and the donation path.
///
/// `Funded` when the goal is reached, otherwise `Failed` once `now` is past
/// the deadline, otherwise `Active`.
#[must_use]
pub fn evaluate_status(
    current_amount: Decimal,
    goal_amount: Decimal,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CampaignStatus {
    if current_amount >= goal_amount {
        CampaignStatus::Funded
    } else if now > deadline {
        CampaignStatus::Failed
    } else {
        CampaignStatus::Active
    }
}

/// Percentage of `goal` covered by `current`, rounded and capped at 100.
#[must_use]
pub fn percent_funded(current: Decimal, goal: Decimal) -> u32 {
    if goal <= Decimal::ZERO {
        return 0;
    }
    if current >= goal {
        return 100;
    }
    current
        .checked_div(goal)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| pct.round().to_u32())
        .map_or(0, |pct| pct.min(100))
}

/// Whole days until `deadline`, rounded up and floored at zero.
#[must_use]
pub fn days_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let diff_ms = (deadline - now).num_milliseconds();
    if diff_ms <= 0 {
        return 0;
    }
    (diff_ms + DAY_MS - 1) / DAY_MS
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn goal_reached_wins_over_deadline() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        assert_eq!(
            evaluate_status(dec!(1000), dec!(1000), past, now),
            CampaignStatus::Funded
        );
    }

    #[test]
    fn expired_without_goal_fails() {
        let now = Utc::now();
        let past = now - Duration::seconds(1);
        assert_eq!(
            evaluate_status(dec!(10), dec!(1000), past, now),
            CampaignStatus::Failed
        );
    }

    #[test]
    fn open_campaign_stays_active() {
        let now = Utc::now();
        assert_eq!(
            evaluate_status(dec!(999.99), dec!(1000), now + Duration::days(3), now),
            CampaignStatus::Active
        );
        // deadline itself is still open
        assert_eq!(
            evaluate_status(dec!(0), dec!(1000), now, now),
            CampaignStatus::Active
        );
    }

    #[test]
    fn percent_is_rounded_and_capped() {
        assert_eq!(percent_funded(dec!(0), dec!(1000)), 0);
        assert_eq!(percent_funded(dec!(333), dec!(1000)), 33);
        assert_eq!(percent_funded(dec!(335), dec!(1000)), 34);
        assert_eq!(percent_funded(dec!(1050), dec!(1000)), 100);
        assert_eq!(percent_funded(dec!(5), dec!(0)), 0);
    }

    #[test]
    fn percent_survives_extreme_amounts() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        assert_eq!(percent_funded(huge, dec!(1000)), 100);
        assert_eq!(percent_funded(Decimal::MAX, Decimal::MAX), 100);
        assert_eq!(percent_funded(huge, Decimal::MAX), 1);
        assert_eq!(percent_funded(huge, huge * dec!(4)), 25);
    }

    #[test]
    fn days_left_rounds_up_and_floors_at_zero() {
        let now = Utc::now();
        assert_eq!(days_left(now + Duration::hours(1), now), 1);
        assert_eq!(days_left(now + Duration::hours(25), now), 2);
        assert_eq!(days_left(now + Duration::days(7), now), 7);
        assert_eq!(days_left(now - Duration::days(2), now), 0);
    }

    #[test]
    fn category_parses_canonical_names_only() {
        assert_eq!("Games".parse::<CampaignCategory>(), Ok(CampaignCategory::Games));
        assert!("games".parse::<CampaignCategory>().is_err());
        assert!("Cooking".parse::<CampaignCategory>().is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CampaignStatus::Active,
            CampaignStatus::Funded,
            CampaignStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CampaignStatus>(), Ok(status));
        }
    }
}
