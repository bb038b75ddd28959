use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::pet::{PetGender, PetStatus, Species};

/// Review state shared by registration and adoption requests
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Listing status a registration may ask for; adopted is not selectable
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegistrationPetStatus {
    #[default]
    ForAdoption,
    Lost,
    Found,
}

impl From<RegistrationPetStatus> for PetStatus {
    fn from(status: RegistrationPetStatus) -> Self {
        match status {
            RegistrationPetStatus::ForAdoption => PetStatus::ForAdoption,
            RegistrationPetStatus::Lost => PetStatus::Lost,
            RegistrationPetStatus::Found => PetStatus::Found,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PetRegistrationRequest {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub age: Option<String>,
    pub gender: PetGender,
    pub pet_status: RegistrationPetStatus,
    pub location: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub image: Option<String>,
    pub status: ReviewStatus,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_pet_id: Option<i64>,
}

/// Registration form as submitted by a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRegistrationRequest {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub age: Option<String>,
    #[serde(default)]
    pub gender: PetGender,
    #[serde(default)]
    pub pet_status: RegistrationPetStatus,
    pub location: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub image: Option<String>,
}
