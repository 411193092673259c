//! Domain layer: campaigns, rewards, donations, and the event system.
//!
//! Plain data and pure lifecycle rules. Nothing here talks to the store;
//! the funding ledgers in [`crate::funding`] are the only code that writes
//! funding fields back.

pub mod campaign;
pub mod donation;
pub mod event_bus;
pub mod funding_event;
pub mod ids;
pub mod reward;

pub use campaign::{Campaign, CampaignCategory, CampaignStatus, CampaignUpdate};
pub use donation::{Donation, DonationStats, PaymentStatus};
pub use event_bus::EventBus;
pub use funding_event::FundingEvent;
pub use ids::{CampaignId, DonationId, RewardId, UserId};
pub use reward::Reward;
