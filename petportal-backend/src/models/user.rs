use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Maximum number of admin accounts that may be registered
pub const MAX_ADMIN_PROFILES: i64 = 3;

/// Portal account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Staff or superuser flag; admin profiles are checked separately
    pub fn has_admin_flags(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Minimal user reference used in participant and sender lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProfileGender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub age: Option<i64>,
    pub phone_number: Option<String>,
    pub gender: Option<ProfileGender>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: i64,
    pub user_id: i64,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Row of the admin user-management listing
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: User,
    pub profile: Option<UserProfile>,
    pub pet_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub age: i64,
    pub phone_number: String,
    pub gender: ProfileGender,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminRegisterRequest {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub admin_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password1: String,
    pub new_password2: String,
}
