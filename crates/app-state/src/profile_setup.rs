//! Profile setup for signed-in users without a profile row

use std::sync::Arc;

use backend_client::{ProfileStore, Session, StoreError};
use thiserror::Error;

use crate::forms::{ProfileForm, ValidationError};
use crate::session::SessionResolver;

/// Confirmation shown once the profile row is written
pub const PROFILE_CREATED_MESSAGE: &str = "Profile created successfully!";

/// Profile setup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// Form rejected before any backend call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The id does not belong to the signed-in user
    #[error("Your session has changed. Please sign in again.")]
    SessionMismatch,

    /// Profile Store rejected the insert
    #[error("{}", .0.message())]
    Store(StoreError),
}

impl SetupError {
    /// Alert title for this failure
    pub fn title(&self) -> &'static str {
        "Error"
    }
}

/// Profile setup screen actions
#[derive(Clone)]
pub struct ProfileSetup {
    profiles: Arc<dyn ProfileStore>,
    resolver: SessionResolver,
}

impl ProfileSetup {
    /// Create the setup actions
    pub fn new(profiles: Arc<dyn ProfileStore>, resolver: SessionResolver) -> Self {
        Self { profiles, resolver }
    }

    /// Form prefilled from what the user entered at sign-up
    pub fn form_for(&self, session: &Session) -> ProfileForm {
        ProfileForm::from_metadata(&session.user.user_metadata)
    }

    /// Write the profile row and have the resolver pick it up
    ///
    /// `user_id` must be the resolver's current session user. Returns once
    /// the resolver has re-resolved, so the state observed afterwards
    /// already reflects the new row.
    pub async fn submit(&self, user_id: &str, form: &ProfileForm) -> Result<(), SetupError> {
        form.validate()?;

        let signed_in = self.resolver.session();
        if signed_in.as_ref().map(|s| s.user_id()) != Some(user_id) {
            tracing::warn!(
                %user_id,
                session_user = signed_in.as_ref().map(|s| s.user_id()),
                "Profile setup for a user other than the signed-in one"
            );
            return Err(SetupError::SessionMismatch);
        }

        let record = form.to_new_profile(user_id);
        self.profiles.insert_profile(&record).await.map_err(|e| {
            tracing::warn!(%user_id, error = %e, "Profile insert failed");
            SetupError::Store(e)
        })?;

        tracing::info!(%user_id, role = %record.role, "Profile created");
        self.resolver.notify_profile_complete().await;
        Ok(())
    }
}
