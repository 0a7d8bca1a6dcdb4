//! Hosted backend client for HydroSnap
//!
//! This crate defines the two capabilities the app consumes from its hosted
//! backend (the Auth Service and the Profile Store), the domain models that
//! flow through them, and an HTTP implementation against a Supabase-style
//! service (GoTrue auth endpoints plus PostgREST row access).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod rest;
pub mod session_store;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{AuthService, SessionEvents, SessionSubscription};
pub use config::{AppEnvironment, BackendConfig};
pub use error::{ApiError, AuthError, ConfigError, StoreError, TransportError};
pub use models::{
    AuthChangeEvent, NewProfile, Profile, Role, Session, SessionChange, User, UserMetadata,
};
pub use rest::HostedBackend;
pub use store::ProfileStore;
