//! Auth and profile form data with validation
//!
//! Validation runs before any backend call; a form that fails validation is
//! left untouched so the user can correct it and resubmit.

use std::sync::OnceLock;

use backend_client::{NewProfile, Role, UserMetadata};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the e-mailed one-time code
pub const OTP_LENGTH: usize = 6;

/// Form validation failure; the message is shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Login without e-mail or password
    #[error("Please enter email and password")]
    MissingCredentials,

    /// A required sign-up or profile field is empty
    #[error("Please fill in all required fields")]
    MissingRequiredFields,

    /// E-mail does not look like an address
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Field personnel without a monitoring site
    #[error("Site ID is required for field personnel")]
    MissingSiteId,

    /// One-time code is not six digits
    #[error("Please enter a valid 6-digit OTP")]
    InvalidOtp,
}

/// Result type for form validation
pub type Result<T> = std::result::Result<T, ValidationError>;

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Check an e-mail address against the accepted shape
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

/// Check a one-time code: exactly six ASCII digits
pub fn validate_otp(code: &str) -> Result<()> {
    let code = code.trim();
    if code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// E-mail and password sign-in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    /// E-mail address
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginForm {
    /// Create a login form
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Validate the form
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.email) || self.password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(())
    }
}

/// Account registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpForm {
    /// E-mail address
    pub email: String,
    /// Password
    pub password: String,
    /// Phone number (optional)
    pub phone: String,
    /// Full name
    pub full_name: String,
    /// Requested role
    pub role: Role,
    /// Organization
    pub organization: String,
    /// Work location or region
    pub location: String,
    /// Monitoring site, required for field personnel
    pub site_id: String,
}

impl SignUpForm {
    /// Validate the form
    ///
    /// Required fields are checked first, then the e-mail shape, then the
    /// site id for field personnel.
    pub fn validate(&self) -> Result<()> {
        let required = [
            &self.email,
            &self.full_name,
            &self.organization,
            &self.location,
        ];
        if self.password.is_empty() || required.iter().any(|field| is_blank(field)) {
            return Err(ValidationError::MissingRequiredFields);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.role.requires_site() && is_blank(&self.site_id) {
            return Err(ValidationError::MissingSiteId);
        }
        Ok(())
    }

    /// E-mail as submitted to the Auth Service
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_string()
    }

    /// Metadata stored on the auth user at sign-up
    pub fn metadata(&self) -> UserMetadata {
        UserMetadata {
            full_name: non_blank(&self.full_name),
            role: Some(self.role),
            organization: non_blank(&self.organization),
            location: non_blank(&self.location),
            phone: non_blank(&self.phone),
            site_id: non_blank(&self.site_id).filter(|_| self.role.requires_site()),
        }
    }

    /// Profile record for the verified user, created at `now`
    pub fn to_new_profile(&self, user_id: &str, now: DateTime<Utc>) -> NewProfile {
        NewProfile::new(
            user_id,
            self.full_name.trim(),
            self.role,
            self.organization.trim(),
            self.location.trim(),
            non_blank(&self.site_id),
        )
        .created(now)
    }
}

/// Profile completion for a signed-in user without a profile row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    /// Full name
    pub full_name: String,
    /// Role
    pub role: Role,
    /// Organization
    pub organization: String,
    /// Work location or region
    pub location: String,
    /// Monitoring site, required for field personnel
    pub site_id: String,
}

impl ProfileForm {
    /// Prefill from the metadata captured at sign-up
    pub fn from_metadata(metadata: &UserMetadata) -> Self {
        Self {
            full_name: metadata.full_name.clone().unwrap_or_default(),
            role: metadata.role.unwrap_or_default(),
            organization: metadata.organization.clone().unwrap_or_default(),
            location: metadata.location.clone().unwrap_or_default(),
            site_id: metadata.site_id.clone().unwrap_or_default(),
        }
    }

    /// Validate the form
    pub fn validate(&self) -> Result<()> {
        if [&self.full_name, &self.organization, &self.location]
            .iter()
            .any(|field| is_blank(field))
        {
            return Err(ValidationError::MissingRequiredFields);
        }
        if self.role.requires_site() && is_blank(&self.site_id) {
            return Err(ValidationError::MissingSiteId);
        }
        Ok(())
    }

    /// Profile record for `user_id`
    pub fn to_new_profile(&self, user_id: &str) -> NewProfile {
        NewProfile::new(
            user_id,
            self.full_name.trim(),
            self.role,
            self.organization.trim(),
            self.location.trim(),
            non_blank(&self.site_id),
        )
    }
}
