//! Main-app screen navigation
//!
//! Sidebar entries name their target by a string key. Keys that map to a
//! [`Screen`] switch screens; the rest belong to features that are not
//! available yet and produce a notice instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Screens reachable inside the main app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Screen {
    /// Dashboard feed
    #[default]
    Dashboard,
    /// Settings and account summary
    Settings,
    /// Profile details
    Profile,
    /// Sign-in screens
    Auth,
}

impl Screen {
    /// Navigation key
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Settings => "Settings",
            Screen::Profile => "Profile",
            Screen::Auth => "Auth",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "Dashboard" => Ok(Screen::Dashboard),
            "Settings" => Ok(Screen::Settings),
            "Profile" => Ok(Screen::Profile),
            "Auth" => Ok(Screen::Auth),
            other => Err(other.to_string()),
        }
    }
}

/// Entry in the sidebar menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarItem {
    /// Text shown
    pub label: &'static str,
    /// Navigation key passed to [`Navigator::navigate`]
    pub target: &'static str,
}

const fn item(label: &'static str, target: &'static str) -> SidebarItem {
    SidebarItem { label, target }
}

/// Sidebar entries for a guest or a signed-in user
pub fn sidebar_items(is_guest: bool) -> Vec<SidebarItem> {
    let mut items = vec![
        item("Dashboard", "Dashboard"),
        item("Water Level Capture", "Capture"),
        item("My Readings", "Readings"),
        item("Site Locations", "Sites"),
        item("Analytics", "Analytics"),
        item("Flood Alerts", "Alerts"),
    ];
    if !is_guest {
        items.push(item("Profile", "Profile"));
    }
    items.push(item("Settings", "Settings"));
    if is_guest {
        items.push(item("Sign In", "Auth"));
    }
    items
}

/// Message shown instead of navigating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Alert title
    pub title: String,
    /// Alert body
    pub message: String,
}

impl Notice {
    /// Create a notice
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Screen changed (or stayed) to this one
    Navigated(Screen),
    /// Request refused; the screen is unchanged
    Notice(Notice),
}

/// Current screen of the main app
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Screen,
    is_guest: bool,
}

impl Navigator {
    /// Start on the dashboard
    pub fn new(is_guest: bool) -> Self {
        Self {
            current: Screen::Dashboard,
            is_guest,
        }
    }

    /// Screen being shown
    pub fn current(&self) -> Screen {
        self.current
    }

    /// Whether the visitor is signed out
    pub fn is_guest(&self) -> bool {
        self.is_guest
    }

    /// Sidebar entries for this visitor
    pub fn sidebar(&self) -> Vec<SidebarItem> {
        sidebar_items(self.is_guest)
    }

    /// Handle a sidebar or in-page navigation request
    pub fn navigate(&mut self, target: &str) -> NavOutcome {
        match target.parse::<Screen>() {
            Ok(Screen::Profile) if self.is_guest => NavOutcome::Notice(Notice::new(
                "Sign In Required",
                "Please sign in to access your profile.",
            )),
            Ok(screen) => {
                tracing::debug!(from = %self.current, to = %screen, "Navigating");
                self.current = screen;
                NavOutcome::Navigated(screen)
            }
            Err(unknown) => {
                tracing::info!(feature = %unknown, "Navigation to unavailable feature");
                NavOutcome::Notice(Notice::new(
                    "Coming Soon",
                    format!("{} feature will be available soon!", unknown),
                ))
            }
        }
    }

    /// Return to the dashboard
    pub fn back(&mut self) {
        self.current = Screen::Dashboard;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidebar_for_guest() {
        let labels: Vec<&str> = sidebar_items(true).iter().map(|i| i.label).collect();
        assert!(labels.contains(&"Sign In"));
        assert!(!labels.contains(&"Profile"));
        assert_eq!(labels.last(), Some(&"Sign In"));
    }

    #[test]
    fn test_sidebar_for_member() {
        let items = sidebar_items(false);
        assert!(items.iter().any(|i| i.target == "Profile"));
        assert!(!items.iter().any(|i| i.target == "Auth"));
        assert_eq!(items.len(), 8);
    }

    #[test]
    fn test_guest_cannot_open_profile() {
        let mut nav = Navigator::new(true);
        let outcome = nav.navigate("Profile");
        assert_eq!(
            outcome,
            NavOutcome::Notice(Notice::new(
                "Sign In Required",
                "Please sign in to access your profile."
            ))
        );
        assert_eq!(nav.current(), Screen::Dashboard);
    }

    #[test]
    fn test_unknown_target_is_coming_soon() {
        let mut nav = Navigator::new(false);
        nav.navigate("Settings");

        match nav.navigate("Analytics") {
            NavOutcome::Notice(notice) => {
                assert_eq!(notice.title, "Coming Soon");
                assert_eq!(notice.message, "Analytics feature will be available soon!");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(nav.current(), Screen::Settings);
    }

    #[test]
    fn test_navigate_and_back() {
        let mut nav = Navigator::new(false);
        assert_eq!(nav.navigate("Profile"), NavOutcome::Navigated(Screen::Profile));
        assert_eq!(nav.current(), Screen::Profile);

        nav.back();
        assert_eq!(nav.current(), Screen::Dashboard);
    }
}
