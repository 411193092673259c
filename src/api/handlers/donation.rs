//! Donation handlers: donate, own history, campaign donations.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{json_body, parse_campaign_id};
use crate::api::dto::{
    CampaignDonationsResponse, CreateDonationRequest, DonationDto, DonationResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorResponse};

/// `POST /donations` — Donate to a campaign, optionally claiming a reward.
///
/// # Errors
///
/// Returns one of the donation failures of [`ApiError`]; no state changes
/// in that case.
#[utoipa::path(
    post,
    path = "/api/v1/donations",
    tag = "Donations",
    summary = "Make a donation",
    description = "Records a donation in one atomic transaction: claims a reward unit if requested, adds the amount to the campaign, and marks the campaign funded when the goal is reached.",
    request_body = CreateDonationRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Donation recorded", body = DonationResponse),
        (status = 400, description = "Invalid amount or reward mismatch", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Campaign or reward not found", body = ErrorResponse),
        (status = 409, description = "Campaign closed or reward exhausted", body = ErrorResponse),
        (status = 422, description = "Below the reward minimum", body = ErrorResponse),
        (status = 503, description = "Transaction aborted, retry", body = ErrorResponse),
    )
)]
pub async fn create_donation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    body: Result<Json<CreateDonationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?.into_request(caller.user_id);
    let receipt = state.donation_service.donate(request).await?;
    Ok((StatusCode::CREATED, Json(DonationResponse::from(receipt))))
}

/// `GET /donations/mine` — The caller's donations, newest first.
///
/// # Errors
///
/// Returns [`ApiError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/donations/mine",
    tag = "Donations",
    summary = "List my donations",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's donations", body = Vec<DonationDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_donations(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let donations = state.donation_service.my_donations(&caller).await?;
    let body: Vec<DonationDto> = donations.into_iter().map(DonationDto::from).collect();
    Ok(Json(body))
}

/// `GET /donations/campaign/{id}` — Completed donations of a campaign.
///
/// # Errors
///
/// Returns [`ApiError`] for a malformed id or on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/donations/campaign/{id}",
    tag = "Donations",
    summary = "List a campaign's donations",
    description = "Completed donations of the campaign, newest first, with their sum and count.",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign UUID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Donations and totals", body = CampaignDonationsResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn campaign_donations(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_campaign_id(&id)?;
    let result = state.donation_service.campaign_donations(id).await?;
    Ok(Json(CampaignDonationsResponse {
        donations: result.donations.into_iter().map(DonationDto::from).collect(),
        stats: result.stats.into(),
    }))
}

/// Donation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/donations", post(create_donation))
        .route("/donations/mine", get(my_donations))
        .route("/donations/campaign/{id}", get(campaign_donations))
}
