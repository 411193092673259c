//! OpenAPI document assembled from the handler annotations.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto;
use super::handlers::{campaign, donation, system};
use crate::domain::{CampaignCategory, CampaignStatus, CampaignUpdate, PaymentStatus};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated API description served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "crowdfund-gateway", description = "Campaigns, rewards and donations"),
    paths(
        campaign::create_campaign,
        campaign::list_campaigns,
        campaign::get_campaign,
        campaign::update_campaign,
        campaign::delete_campaign,
        campaign::post_campaign_update,
        donation::create_donation,
        donation::my_donations,
        donation::campaign_donations,
        system::health_handler,
    ),
    components(schemas(
        dto::CampaignDto,
        dto::RewardDto,
        dto::CampaignListResponse,
        dto::CampaignDetailResponse,
        dto::CampaignMutationResponse,
        dto::CreateCampaignRequest,
        dto::CreateRewardRequest,
        dto::UpdateCampaignRequest,
        dto::PostUpdateRequest,
        dto::CreateDonationRequest,
        dto::DonationDto,
        dto::DonationResponse,
        dto::FundedProjectDto,
        dto::DonationStatsDto,
        dto::CampaignDonationsResponse,
        dto::PaginationMeta,
        dto::MessageResponse,
        CampaignCategory,
        CampaignStatus,
        CampaignUpdate,
        PaymentStatus,
        ErrorResponse,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Campaigns", description = "Campaign content and lifecycle"),
        (name = "Donations", description = "Donations and donation history"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
