use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Days a found pet stays in the found list before moving to adoption
pub const FOUND_TO_ADOPTION_DAYS: i64 = 15;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PetStatus {
    #[default]
    ForAdoption,
    Lost,
    Found,
    Adopted,
}

impl PetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ForAdoption => "For Adoption",
            Self::Lost => "Lost",
            Self::Found => "Found",
            Self::Adopted => "Adopted/Reunited",
        }
    }

    /// Lost and found listings must carry contact details
    pub fn requires_contact(&self) -> bool {
        matches!(self, Self::Lost | Self::Found)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Species {
    #[default]
    Dog,
    Cat,
    Rabbit,
    Bird,
    Other,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PetGender {
    Male,
    Female,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub color: Option<String>,
    /// Free text, e.g. "2 years", "6 months", "Puppy"
    pub age: Option<String>,
    pub gender: PetGender,
    pub status: PetStatus,
    pub location: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub owner_id: Option<i64>,
    pub image: Option<String>,
    pub date_added: DateTime<Utc>,
    pub found_date: Option<DateTime<Utc>>,
}

impl Pet {
    /// A found pet moves to adoption once it has been found for the full period
    pub fn should_move_to_adoption(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.found_date) {
            (PetStatus::Found, Some(found)) => now >= found + Duration::days(FOUND_TO_ADOPTION_DAYS),
            _ => false,
        }
    }

    /// Whole days left before the pet moves to adoption
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        match self.found_date {
            Some(found) => {
                let days_passed = now.signed_duration_since(found).num_days();
                (FOUND_TO_ADOPTION_DAYS - days_passed).max(0)
            }
            None => FOUND_TO_ADOPTION_DAYS,
        }
    }
}

/// Values for inserting a pet
#[derive(Debug, Clone, Default)]
pub struct NewPet {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub age: Option<String>,
    pub gender: PetGender,
    pub status: PetStatus,
    pub location: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub owner_id: Option<i64>,
    pub image: Option<String>,
    pub found_date: Option<DateTime<Utc>>,
}

/// Editable pet fields as submitted by owners and admins
#[derive(Debug, Clone, Deserialize)]
pub struct PetInput {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub color: Option<String>,
    pub age: Option<String>,
    #[serde(default)]
    pub gender: PetGender,
    #[serde(default)]
    pub status: PetStatus,
    pub location: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub image: Option<String>,
}

/// Pet as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct PetListing {
    #[serde(flatten)]
    pub pet: Pet,
    pub status_display: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

impl PetListing {
    pub fn new(pet: Pet, now: DateTime<Utc>) -> Self {
        let days_remaining = (pet.status == PetStatus::Found).then(|| pet.days_remaining(now));
        Self {
            status_display: pet.status.label(),
            pet,
            owner_username: None,
            days_remaining,
        }
    }

    pub fn with_owner(mut self, owner_username: Option<String>) -> Self {
        self.owner_username = owner_username;
        self
    }
}
