//! Data Transfer Objects for REST request/response serialization.
//!
//! Bodies use camelCase field names. Money amounts are serialized as JSON
//! strings to keep decimal precision.

pub mod campaign_dto;
pub mod common_dto;
pub mod donation_dto;

pub use campaign_dto::*;
pub use common_dto::*;
pub use donation_dto::*;
