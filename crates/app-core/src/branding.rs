//! HydroSnap branding
//!
//! Text constants shown in headers and the about section.

/// Application name
pub const APP_NAME: &str = "HydroSnap";

/// Title under the greeting
pub const APP_TITLE: &str = "HydroSnap Monitor";

/// Sidebar subtitle
pub const APP_TAGLINE: &str = "Water Monitoring";

/// Hero line prefix, followed by the long date
pub const HERO_SUBTITLE: &str = "Water Level Data Collection";

/// Application version (from Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version as shown in settings, e.g. `v0.1.0`
pub fn version_label() -> String {
    format!("v{}", APP_VERSION)
}
