//! Profile Store capability

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewProfile, Profile};

/// Row storage for application profiles, keyed by user id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch exactly one profile row for `user_id`
    ///
    /// Fails with [`StoreError::NotFound`] when no row exists yet.
    async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError>;

    /// Insert a new profile row
    async fn insert_profile(&self, record: &NewProfile) -> Result<(), StoreError>;
}
