//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::domain::EventBus;
use crate::service::{CampaignService, DonationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Campaign content and lifecycle.
    pub campaign_service: Arc<CampaignService>,
    /// Donations and donation history.
    pub donation_service: Arc<DonationService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Bearer token verifier.
    pub verifier: Arc<TokenVerifier>,
}
