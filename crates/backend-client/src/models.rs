//! Domain models exchanged with the hosted backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated session issued by the Auth Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for authenticated requests
    pub access_token: String,
    /// Token type (always "bearer" in practice)
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: i64,
    /// Absolute expiry as a unix timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Token used to obtain a fresh access token
    pub refresh_token: String,
    /// The user this session belongs to
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Identifier of the session's user
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token has expired at `now`
    ///
    /// Sessions without an absolute expiry are treated as valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expires_at| expires_at <= now.timestamp())
            .unwrap_or(false)
    }

    /// Fill in `expires_at` from `expires_in` when the backend omitted it
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(issued_at.timestamp() + self.expires_in);
        }
        self
    }
}

/// Identity record held by the Auth Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier (also the profile row key)
    pub id: String,
    /// E-mail address
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Metadata supplied at sign-up
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl User {
    /// Create a user with only an id and e-mail
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            phone: None,
            user_metadata: UserMetadata::default(),
        }
    }
}

/// Sign-up metadata stored on the auth user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Full name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Requested role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Work location or region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Monitoring site, for field personnel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

/// Application role of a HydroSnap user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Headquarters staff for data analysis and policy decisions
    CentralAnalyst,
    /// Regional supervisor managing multiple monitoring sites
    Supervisor,
    /// On-ground staff taking water level readings at monitoring sites
    FieldPersonnel,
    /// General public contributing to water level monitoring
    #[default]
    Public,
}

impl Role {
    /// Every role, in the order they are offered at sign-up
    pub const ALL: [Role; 4] = [
        Role::CentralAnalyst,
        Role::Supervisor,
        Role::FieldPersonnel,
        Role::Public,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CentralAnalyst => "central_analyst",
            Role::Supervisor => "supervisor",
            Role::FieldPersonnel => "field_personnel",
            Role::Public => "public",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Role::CentralAnalyst => "Central Analyst",
            Role::Supervisor => "Supervisor",
            Role::FieldPersonnel => "Field Personnel",
            Role::Public => "Public User",
        }
    }

    /// One-line description shown next to the label
    pub fn description(&self) -> &'static str {
        match self {
            Role::CentralAnalyst => "CWC headquarters staff for data analysis and policy decisions",
            Role::Supervisor => "Regional supervisors managing multiple monitoring sites",
            Role::FieldPersonnel => {
                "On-ground staff taking water level readings at monitoring sites"
            }
            Role::Public => "General public contributing to water level monitoring",
        }
    }

    /// Field personnel must be assigned to a monitoring site
    pub fn requires_site(&self) -> bool {
        matches!(self, Role::FieldPersonnel)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application profile row, one per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// User identifier
    pub id: String,
    /// Full name
    pub full_name: String,
    /// Role
    pub role: Role,
    /// Organization
    pub organization: String,
    /// Work location or region
    pub location: String,
    /// Assigned monitoring site (field personnel only)
    #[serde(default)]
    pub site_id: Option<String>,
    /// Row creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the account is active
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Record inserted into the Profile Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    /// User identifier
    pub id: String,
    /// Full name
    pub full_name: String,
    /// Role
    pub role: Role,
    /// Organization
    pub organization: String,
    /// Work location or region
    pub location: String,
    /// Assigned monitoring site; always `None` unless the role requires one
    pub site_id: Option<String>,
    /// Creation time; left to the database default when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Active flag; left to the database default when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl NewProfile {
    /// Build an insert record, dropping the site id for roles that have none
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
        organization: impl Into<String>,
        location: impl Into<String>,
        site_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            role,
            organization: organization.into(),
            location: location.into(),
            site_id: site_id.filter(|_| role.requires_site()),
            created_at: None,
            is_active: None,
        }
    }

    /// Stamp the record as created at `now` and active
    pub fn created(mut self, now: DateTime<Utc>) -> Self {
        self.created_at = Some(now);
        self.is_active = Some(true);
        self
    }

    /// The row as the store will hold it
    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            full_name: self.full_name,
            role: self.role,
            organization: self.organization,
            location: self.location,
            site_id: self.site_id,
            created_at: self.created_at,
            is_active: self.is_active,
        }
    }
}

/// Kind of session change broadcast by the Auth Service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChangeEvent {
    /// A session was created (password, OTP, or sign-up)
    SignedIn,
    /// The session was destroyed
    SignedOut,
    /// The access token was refreshed
    TokenRefreshed,
    /// The user record changed
    UserUpdated,
}

/// Notification delivered to session subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    /// What happened
    pub event: AuthChangeEvent,
    /// The session after the change, if any
    pub session: Option<Session>,
}

impl SessionChange {
    /// Create a change notification
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}
