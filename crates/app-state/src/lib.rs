//! Application state management for HydroSnap
//!
//! This crate owns the session resolver, which decides which top-level screen
//! the app shows, and the authentication and profile-setup flows that feed
//! it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth_flow;
pub mod forms;
pub mod profile_setup;
pub mod session;

pub use auth_flow::{AuthFlow, FlowError, PendingVerification};
pub use forms::{LoginForm, ProfileForm, SignUpForm, ValidationError};
pub use profile_setup::{ProfileSetup, SetupError, PROFILE_CREATED_MESSAGE};
pub use session::{
    ResolvedState, ResolverConfig, ResolverHandle, SessionResolver,
    DEFAULT_PROFILE_GRACE_PERIOD, INIT_FAILURE_MESSAGE,
};
