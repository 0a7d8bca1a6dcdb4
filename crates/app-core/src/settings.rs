//! Settings screen: account summary, preferences, logout

use app_state::{ResolvedState, SessionResolver};
use backend_client::{AuthError, Profile, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::navigation::Notice;

/// Name shown when neither the profile nor the sign-up metadata has one
pub const DEFAULT_NAME: &str = "User";

/// Organization shown when the profile has none
pub const DEFAULT_ORGANIZATION: &str = "HydroSnap Team";

/// Role shown when there is no profile
pub const DEFAULT_ROLE_LABEL: &str = "Water Monitoring Personnel";

/// Message shown when sign-out fails
pub const LOGOUT_FAILED_MESSAGE: &str = "Failed to logout. Please try again.";

/// Account details on the settings screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// E-mail, empty when unknown
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Organization
    pub organization: String,
    /// Role label
    pub role: String,
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl AccountSummary {
    /// Build from whatever is known about the user
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        let full_name = profile
            .and_then(|p| non_empty(&p.full_name))
            .or_else(|| user.user_metadata.full_name.as_deref().and_then(non_empty))
            .unwrap_or(DEFAULT_NAME);
        let organization = profile
            .and_then(|p| non_empty(&p.organization))
            .unwrap_or(DEFAULT_ORGANIZATION);
        let role = profile
            .map(|p| p.role.label())
            .unwrap_or(DEFAULT_ROLE_LABEL);

        Self {
            email: user.email.clone().unwrap_or_default(),
            full_name: full_name.to_string(),
            organization: organization.to_string(),
            role: role.to_string(),
        }
    }

    /// Summary for the resolved state, if a user is signed in
    pub fn from_state(state: &ResolvedState) -> Option<Self> {
        match state {
            ResolvedState::Ready { session, profile } => {
                Some(Self::new(&session.user, Some(profile)))
            }
            _ => None,
        }
    }
}

/// Toggleable preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    /// Push notifications
    PushNotifications,
    /// Location services
    LocationServices,
    /// Automatic data sync
    AutoSync,
}

/// Preference switches, all on by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Push notifications enabled
    pub push_notifications: bool,
    /// Location services enabled
    pub location_services: bool,
    /// Automatic sync enabled
    pub auto_sync: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            push_notifications: true,
            location_services: true,
            auto_sync: true,
        }
    }
}

impl Preferences {
    /// Current value of a switch
    pub fn get(&self, preference: Preference) -> bool {
        match preference {
            Preference::PushNotifications => self.push_notifications,
            Preference::LocationServices => self.location_services,
            Preference::AutoSync => self.auto_sync,
        }
    }

    /// Set a switch
    pub fn set(&mut self, preference: Preference, enabled: bool) {
        let slot = match preference {
            Preference::PushNotifications => &mut self.push_notifications,
            Preference::LocationServices => &mut self.location_services,
            Preference::AutoSync => &mut self.auto_sync,
        };
        *slot = enabled;
    }
}

/// Logout failure
#[derive(Debug, Clone, Error)]
#[error("Failed to logout. Please try again.")]
pub struct LogoutError {
    /// Underlying auth failure
    #[source]
    pub source: AuthError,
}

impl LogoutError {
    /// Alert for this failure
    pub fn notice(&self) -> Notice {
        Notice::new("Error", LOGOUT_FAILED_MESSAGE)
    }
}

/// Settings screen actions
#[derive(Clone)]
pub struct SettingsPage {
    resolver: SessionResolver,
    preferences: Preferences,
}

impl SettingsPage {
    /// Settings backed by the session resolver
    pub fn new(resolver: SessionResolver) -> Self {
        Self {
            resolver,
            preferences: Preferences::default(),
        }
    }

    /// Account summary for the signed-in user
    pub fn account(&self) -> Option<AccountSummary> {
        AccountSummary::from_state(&self.resolver.state())
    }

    /// Preference switches
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Flip a switch and return its new value
    pub fn toggle(&mut self, preference: Preference) -> bool {
        let enabled = !self.preferences.get(preference);
        self.preferences.set(preference, enabled);
        tracing::debug!(?preference, enabled, "Preference changed");
        enabled
    }

    /// Sign out; on success the resolver is back to `Unauthenticated`
    pub async fn logout(&self) -> Result<Notice, LogoutError> {
        self.resolver
            .sign_out_and_reset()
            .await
            .map_err(|source| LogoutError { source })?;
        Ok(Notice::new("Logout", "You have been logged out successfully."))
    }
}
