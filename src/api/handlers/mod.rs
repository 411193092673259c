//! REST endpoint handlers organized by resource.

pub mod campaign;
pub mod donation;
pub mod system;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;

use crate::app_state::AppState;
use crate::domain::CampaignId;
use crate::error::ApiError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(campaign::routes())
        .merge(donation::routes())
}

/// Unwraps a JSON body, turning extractor rejections into [`ApiError`].
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

/// Parses a campaign id path segment.
fn parse_campaign_id(raw: &str) -> Result<CampaignId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidRequest(format!("invalid campaign id {raw}")))
}
