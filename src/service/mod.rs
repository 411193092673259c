//! Service layer: business logic orchestration.
//!
//! [`CampaignService`] handles campaign content and lifecycle refresh,
//! [`DonationService`] fronts the donation coordinator and history reads.
//! Both emit events through the [`super::domain::EventBus`].

pub mod campaign_service;
pub mod donation_service;
pub mod lifecycle;

pub use campaign_service::{CampaignDetail, CampaignDraft, CampaignService, RewardDraft};
pub use donation_service::{CampaignDonations, DonationService};
pub use lifecycle::spawn_lifecycle_sweep;
