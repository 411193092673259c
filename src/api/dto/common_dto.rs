//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Total number of items.
    pub total: u64,
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Total number of pages.
    pub total_pages: u64,
}

impl PaginationMeta {
    /// Builds the metadata for `total` items split into pages of `limit`.
    #[must_use]
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Wraps a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) const fn default_page() -> u32 {
    1
}

pub(crate) const fn default_limit() -> u32 {
    10
}

/// Clamps a 1-indexed page and its size, returning `(page, limit, offset)`.
#[must_use]
pub fn clamp_page(page: u32, limit: u32) -> (u32, u32, u64) {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let offset = u64::from(page - 1) * u64::from(limit);
    (page, limit, offset)
}
