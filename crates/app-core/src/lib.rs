//! Core application logic for HydroSnap
//!
//! Data and decisions behind the main-app screens: the dashboard feed, the
//! greeting header, sidebar navigation, and the settings page. Also owns
//! log output setup.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branding;
pub mod dashboard;
pub mod greeting;
pub mod logging;
pub mod navigation;
pub mod settings;

pub use dashboard::{CardKind, DashboardCard, DashboardSection, MonitoringStats, Severity};
pub use navigation::{NavOutcome, Navigator, Notice, Screen, SidebarItem};
pub use settings::{AccountSummary, LogoutError, Preference, Preferences, SettingsPage};
