//! # crowdfund-gateway
//!
//! REST API and WebSocket gateway for a crowdfunding platform: campaigns
//! with reward tiers, and donations that fund them.
//!
//! Every donation runs as one atomic store transaction that validates the
//! campaign and reward, reserves a reward unit, records the donation and
//! updates the campaign total and status. Either all of it happens or none
//! of it does.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)  ── AuthUser (auth/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── CampaignService / DonationService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── DonationCoordinator + ledgers (funding/)
//!     │
//!     └── FundingStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod funding;
pub mod persistence;
pub mod service;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::auth::TokenVerifier;
use crate::config::GatewayConfig;
use crate::domain::EventBus;
use crate::funding::DonationCoordinator;
use crate::persistence::FundingStore;
use crate::service::{CampaignService, DonationService};
use crate::ws::handler::ws_handler;

/// Wires services around `store`.
#[must_use]
pub fn build_state(
    store: Arc<dyn FundingStore>,
    config: &GatewayConfig,
    verifier: TokenVerifier,
) -> AppState {
    let event_bus = EventBus::new(config.event_bus_capacity);
    let coordinator = DonationCoordinator::new(
        Arc::clone(&store),
        event_bus.clone(),
        config.donation_tx_timeout(),
    );
    AppState {
        campaign_service: Arc::new(CampaignService::new(Arc::clone(&store), event_bus.clone())),
        donation_service: Arc::new(DonationService::new(store, coordinator)),
        event_bus,
        verifier: Arc::new(verifier),
    }
}

/// Builds the full HTTP application: REST routes, `/ws`, and middleware.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}
