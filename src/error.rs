//! Gateway error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type. Each variant maps to a specific
//! HTTP status code and a structured JSON error response. The donation
//! failure taxonomy (`InvalidAmount` through `TransactionAborted`) is
//! surfaced one-to-one so clients can show a distinct message per case.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CampaignId, RewardId};
use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2102,
///     "message": "reward is no longer available"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                    |
/// |-----------|-------------------|--------------------------------|
/// | 1000–1099 | Validation        | 400 Bad Request                |
/// | 1100–1199 | Identity          | 401 / 403                      |
/// | 2000–2099 | Not Found         | 404 Not Found                  |
/// | 2100–2199 | State             | 409 Conflict                   |
/// | 3000–3999 | Server            | 500 / 503                      |
/// | 4000–4999 | Funding rules     | 422 Unprocessable Entity       |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Donation amount missing, non-numeric, zero, negative or below one unit.
    #[error("invalid donation amount")]
    InvalidAmount,

    /// Reward exists but belongs to another campaign.
    #[error("reward {reward_id} does not belong to campaign {campaign_id}")]
    RewardMismatch {
        /// Requested reward.
        reward_id: RewardId,
        /// Campaign named in the request.
        campaign_id: CampaignId,
    },

    /// Missing or invalid identity token.
    #[error("authentication required: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the required role or ownership.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Campaign id does not resolve.
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// Reward id does not resolve.
    #[error("reward not found: {0}")]
    RewardNotFound(String),

    /// Campaign status is not `Active`.
    #[error("campaign {0} is no longer accepting donations")]
    CampaignNotAcceptingFunds(CampaignId),

    /// Limited reward is fully claimed.
    #[error("reward {0} is no longer available")]
    RewardExhausted(RewardId),

    /// Donation below the reward's minimum.
    #[error("donation must be at least {minimum} to receive this reward")]
    InsufficientAmount {
        /// Reward minimum.
        minimum: Decimal,
    },

    /// Store-level failure (conflict, timeout, connectivity) inside a
    /// donation transaction. The whole request may be retried.
    #[error("donation could not be completed, please retry")]
    TransactionAborted,

    /// Persistence layer failure outside the donation path.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAmount => 1002,
            Self::RewardMismatch { .. } => 1003,
            Self::Unauthorized(_) => 1101,
            Self::Forbidden(_) => 1102,
            Self::CampaignNotFound(_) => 2001,
            Self::RewardNotFound(_) => 2002,
            Self::CampaignNotAcceptingFunds(_) => 2101,
            Self::RewardExhausted(_) => 2102,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::TransactionAborted => 3002,
            Self::InsufficientAmount { .. } => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAmount | Self::RewardMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::CampaignNotFound(_) | Self::RewardNotFound(_) => StatusCode::NOT_FOUND,
            Self::CampaignNotAcceptingFunds(_) | Self::RewardExhausted(_) => StatusCode::CONFLICT,
            Self::InsufficientAmount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionAborted => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Server-side failures are replaced with a
    /// generic text so storage details never leak.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.client_message(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn funding_taxonomy_maps_to_distinct_codes() {
        let errors = [
            ApiError::InvalidAmount,
            ApiError::CampaignNotFound("x".to_string()),
            ApiError::CampaignNotAcceptingFunds(CampaignId::new()),
            ApiError::RewardNotFound("y".to_string()),
            ApiError::RewardMismatch {
                reward_id: RewardId::new(),
                campaign_id: CampaignId::new(),
            },
            ApiError::InsufficientAmount { minimum: dec!(10) },
            ApiError::RewardExhausted(RewardId::new()),
            ApiError::TransactionAborted,
        ];
        let mut codes: Vec<u32> = errors.iter().map(ApiError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::InvalidAmount.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RewardExhausted(RewardId::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InsufficientAmount { minimum: dec!(1) }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::TransactionAborted.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::Internal("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "internal server error");
        let err = ApiError::InsufficientAmount { minimum: dec!(10) };
        assert!(err.client_message().contains("10"));
    }
}
