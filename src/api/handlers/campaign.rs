//! Campaign handlers: create, list, detail, edit, delete, post update.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use super::{json_body, parse_campaign_id};
use crate::api::dto::{
    CampaignDetailResponse, CampaignDto, CampaignListQuery, CampaignListResponse,
    CampaignMutationResponse, CreateCampaignRequest, MessageResponse, PaginationMeta,
    PostUpdateRequest, RewardDto, UpdateCampaignRequest,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorResponse};
use crate::persistence::CampaignPatch;
use crate::service::{CampaignDetail, CampaignDraft};

fn detail_response(detail: CampaignDetail) -> CampaignDetailResponse {
    CampaignDetailResponse {
        campaign: CampaignDto::from_campaign(detail.campaign, Utc::now()),
        rewards: detail.rewards.into_iter().map(RewardDto::from).collect(),
    }
}

/// `POST /campaigns` — Create a campaign with optional rewards.
///
/// # Errors
///
/// Returns [`ApiError`] for invalid fields or a caller without the
/// Creator role.
#[utoipa::path(
    post,
    path = "/api/v1/campaigns",
    tag = "Campaigns",
    summary = "Create a campaign",
    description = "Creates a campaign owned by the caller, together with its reward tiers. Requires the Creator role; the deadline must be in the future.",
    request_body = CreateCampaignRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Campaign created", body = CampaignDetailResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Creator role required", body = ErrorResponse),
    )
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    body: Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let draft: CampaignDraft = json_body(body)?.try_into()?;
    let detail = state.campaign_service.create(&caller, draft).await?;
    Ok((StatusCode::CREATED, Json(detail_response(detail))))
}

/// `GET /campaigns` — List campaigns with filters, sorting and pagination.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown category or status filter.
#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    tag = "Campaigns",
    summary = "List campaigns",
    description = "Returns a page of campaigns filtered by category, status and a case-insensitive search on title and short description.",
    params(CampaignListQuery),
    responses(
        (status = 200, description = "Paginated campaign list", body = CampaignListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
    )
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    query: Result<Query<CampaignListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) =
        query.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let (filter, page, limit) = query.into_filter()?;
    let result = state.campaign_service.list(&filter).await?;
    let now = Utc::now();

    Ok(Json(CampaignListResponse {
        campaigns: result
            .campaigns
            .into_iter()
            .map(|c| CampaignDto::from_campaign(c, now))
            .collect(),
        pagination: PaginationMeta::new(result.total, page, limit),
    }))
}

/// `GET /campaigns/{id}` — Campaign detail with rewards.
///
/// # Errors
///
/// Returns [`ApiError::CampaignNotFound`] if the campaign does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}",
    tag = "Campaigns",
    summary = "Get campaign details",
    description = "Refreshes the campaign's lifecycle status, then returns it with its rewards.",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign UUID"),
    ),
    responses(
        (status = 200, description = "Campaign details", body = CampaignDetailResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Campaign not found", body = ErrorResponse),
    )
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_campaign_id(&id)?;
    let detail = state.campaign_service.detail(id).await?;
    Ok(Json(detail_response(detail)))
}

/// `PUT /campaigns/{id}` — Edit campaign content.
///
/// # Errors
///
/// Returns [`ApiError`] if the caller is not the owning Creator or the
/// campaign does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/campaigns/{id}",
    tag = "Campaigns",
    summary = "Edit a campaign",
    description = "Updates title, short description, description, category or image. Funding fields cannot be edited.",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign UUID"),
    ),
    request_body = UpdateCampaignRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Campaign updated", body = CampaignMutationResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Campaign not found", body = ErrorResponse),
    )
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateCampaignRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_campaign_id(&id)?;
    let patch: CampaignPatch = json_body(body)?.try_into()?;
    let campaign = state
        .campaign_service
        .update_content(&caller, id, patch)
        .await?;
    Ok(Json(CampaignMutationResponse {
        message: "Campaign updated successfully".to_string(),
        campaign: CampaignDto::from_campaign(campaign, Utc::now()),
    }))
}

/// `DELETE /campaigns/{id}` — Delete a campaign and its rewards.
///
/// # Errors
///
/// Returns [`ApiError`] unless the caller owns the campaign or is an Admin.
#[utoipa::path(
    delete,
    path = "/api/v1/campaigns/{id}",
    tag = "Campaigns",
    summary = "Delete a campaign",
    description = "Deletes the campaign and its rewards. Recorded donations are kept.",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign UUID"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Campaign deleted", body = MessageResponse),
        (status = 403, description = "Not the owner or an admin", body = ErrorResponse),
        (status = 404, description = "Campaign not found", body = ErrorResponse),
    )
)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_campaign_id(&id)?;
    state.campaign_service.delete(&caller, id).await?;
    Ok(Json(MessageResponse::new("Campaign deleted successfully")))
}

/// `POST /campaigns/{id}/updates` — Post a progress update.
///
/// # Errors
///
/// Returns [`ApiError`] for blank text or a caller who is not the owning
/// Creator.
#[utoipa::path(
    post,
    path = "/api/v1/campaigns/{id}/updates",
    tag = "Campaigns",
    summary = "Post a campaign update",
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign UUID"),
    ),
    request_body = PostUpdateRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Update posted", body = CampaignMutationResponse),
        (status = 400, description = "Blank text", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
    )
)]
pub async fn post_campaign_update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<PostUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_campaign_id(&id)?;
    let req = json_body(body)?;
    let campaign = state
        .campaign_service
        .post_update(&caller, id, &req.text)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CampaignMutationResponse {
            message: "Update added successfully".to_string(),
            campaign: CampaignDto::from_campaign(campaign, Utc::now()),
        }),
    ))
}

/// Campaign routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/campaigns/{id}",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/campaigns/{id}/updates", post(post_campaign_update))
}
