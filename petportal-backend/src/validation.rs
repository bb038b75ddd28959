//! Form validation for account and pet submissions

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    AdminRegisterRequest, NewRegistrationRequest, PetInput, PetStatus, RegisterRequest,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_AGE: i64 = 13;
pub const MAX_AGE: i64 = 120;
pub const MAX_PHONE_LENGTH: usize = 15;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+\-]{1,150}$").expect("valid username regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Enter a valid username. Letters, digits and @/./+/-/_ only.")]
    InvalidUsername,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("The two password fields didn't match.")]
    PasswordMismatch,
    #[error("This password is too short. It must contain at least {min} characters.", min = MIN_PASSWORD_LENGTH)]
    PasswordTooShort,
    #[error("Age must be between {min} and {max}.", min = MIN_AGE, max = MAX_AGE)]
    AgeOutOfRange,
    #[error("Phone number must be at most {max} characters.", max = MAX_PHONE_LENGTH)]
    PhoneTooLong,
    #[error("Contact email and phone are required for lost and found pets.")]
    ContactRequired,
}

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    required(username, "Username")?;
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    required(email, "Email")?;
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Both entries must match and meet the minimum length
pub fn validate_new_password(password1: &str, password2: &str) -> Result<(), ValidationError> {
    if password1 != password2 {
        return Err(ValidationError::PasswordMismatch);
    }
    if password1.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_registration(form: &RegisterRequest) -> Result<(), ValidationError> {
    validate_username(&form.username)?;
    validate_email(&form.email)?;
    validate_new_password(&form.password1, &form.password2)?;
    if !(MIN_AGE..=MAX_AGE).contains(&form.age) {
        return Err(ValidationError::AgeOutOfRange);
    }
    required(&form.phone_number, "Phone number")?;
    if form.phone_number.trim().chars().count() > MAX_PHONE_LENGTH {
        return Err(ValidationError::PhoneTooLong);
    }
    required(&form.location, "Location")?;
    Ok(())
}

pub fn validate_admin_registration(form: &AdminRegisterRequest) -> Result<(), ValidationError> {
    validate_username(&form.username)?;
    validate_email(&form.email)?;
    validate_new_password(&form.password1, &form.password2)?;
    required(&form.admin_code, "Admin code")?;
    Ok(())
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn validate_contact(
    status: PetStatus,
    email: &Option<String>,
    phone: &Option<String>,
) -> Result<(), ValidationError> {
    if status.requires_contact() && !(has_text(email) && has_text(phone)) {
        return Err(ValidationError::ContactRequired);
    }
    if let Some(email) = email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}

pub fn validate_pet_input(input: &PetInput) -> Result<(), ValidationError> {
    required(&input.name, "Name")?;
    required(&input.location, "Location")?;
    validate_contact(input.status, &input.contact_email, &input.contact_phone)
}

pub fn validate_registration_request(form: &NewRegistrationRequest) -> Result<(), ValidationError> {
    required(&form.name, "Name")?;
    required(&form.location, "Location")?;
    validate_contact(form.pet_status.into(), &form.contact_email, &form.contact_phone)
}
