//! HydroSnap client core
//!
//! Re-exports the workspace crates and wires them together: one Auth Service
//! and Profile Store shared by the session resolver and the flows that feed
//! it.
//!
//! # Example
//!
//! ```rust,no_run
//! use hydrosnap::App;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hydrosnap::AppError> {
//!     hydrosnap::app_core::logging::init();
//!
//!     let app = App::from_env()?;
//!     let handle = app.start();
//!
//!     let mut states = app.resolver().watch();
//!     while states.changed().await.is_ok() {
//!         println!("screen: {}", states.borrow().label());
//!     }
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;

use thiserror::Error;

pub use app_core;
pub use app_state;
pub use backend_client;

use app_core::{Navigator, SettingsPage};
use app_state::{AuthFlow, ProfileSetup, ResolvedState, ResolverConfig, ResolverHandle, SessionResolver};
use backend_client::{AuthService, BackendConfig, ConfigError, HostedBackend, ProfileStore, TransportError};

/// Startup failure
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend settings missing or invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The wired-up client
#[derive(Clone)]
pub struct App {
    resolver: SessionResolver,
    auth_flow: AuthFlow,
    profile_setup: ProfileSetup,
}

impl App {
    /// Wire the client over any Auth Service and Profile Store
    pub fn new(
        auth: Arc<dyn AuthService>,
        profiles: Arc<dyn ProfileStore>,
        config: ResolverConfig,
    ) -> Self {
        let resolver = SessionResolver::new(auth.clone(), profiles.clone(), config);
        Self {
            auth_flow: AuthFlow::new(auth, profiles.clone()),
            profile_setup: ProfileSetup::new(profiles, resolver.clone()),
            resolver,
        }
    }

    /// Wire the client against the hosted backend
    pub fn from_config(config: BackendConfig) -> Result<Self, AppError> {
        tracing::info!(url = %config.url, environment = ?config.environment, "Connecting to backend");
        let backend = Arc::new(HostedBackend::new(config)?);
        Ok(Self::new(backend.clone(), backend, ResolverConfig::default()))
    }

    /// Wire the client from `HYDROSNAP_*` environment variables
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_config(BackendConfig::from_env()?)
    }

    /// Bootstrap the resolver and follow session changes
    pub fn start(&self) -> ResolverHandle {
        self.resolver.start()
    }

    /// Session resolver
    pub fn resolver(&self) -> &SessionResolver {
        &self.resolver
    }

    /// Auth screen actions
    pub fn auth_flow(&self) -> &AuthFlow {
        &self.auth_flow
    }

    /// Profile setup actions
    pub fn profile_setup(&self) -> &ProfileSetup {
        &self.profile_setup
    }

    /// Settings page for the current user
    pub fn settings(&self) -> SettingsPage {
        SettingsPage::new(self.resolver.clone())
    }

    /// Main-app navigation, guest unless the user is fully signed in
    pub fn navigator(&self) -> Navigator {
        Navigator::new(!matches!(self.resolver.state(), ResolvedState::Ready { .. }))
    }
}
