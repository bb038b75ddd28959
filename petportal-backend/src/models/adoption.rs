use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumString;

use super::registration::ReviewStatus;

#[derive(Debug, Clone, Serialize)]
pub struct AdoptionRequest {
    pub id: i64,
    pub pet_id: i64,
    pub user_id: i64,
    pub status: ReviewStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Adoption request with the pet and requester names resolved
#[derive(Debug, Clone, Serialize)]
pub struct AdoptionRequestDetail {
    #[serde(flatten)]
    pub request: AdoptionRequest,
    pub pet_name: String,
    pub requester_username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAdoptionRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Owner decision on an incoming adoption request
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AdoptionAction {
    Approve,
    Reject,
}
