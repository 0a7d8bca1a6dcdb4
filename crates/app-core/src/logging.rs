//! Log output setup
//!
//! Installs a `tracing-subscriber` formatter filtered by `RUST_LOG`, falling
//! back to [`DEFAULT_FILTER`]. Call once at startup; later calls are no-ops.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Log setup failure
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Offending directive
        directive: String,
        /// Parser message
        reason: String,
    },
}

/// Build the filter from `RUST_LOG`, or `fallback` when unset or invalid
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Parse an explicit filter directive such as `"app_state=debug,info"`
pub fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    init_with(env_filter(DEFAULT_FILTER))
}

/// Install the global subscriber with an explicit filter
pub fn init_with(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
