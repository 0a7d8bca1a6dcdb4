//! Header greeting and user display name

use chrono::{NaiveDate, Timelike};

/// Name shown when the user has no usable e-mail
pub const FALLBACK_NAME: &str = "User";

/// Name shown to signed-out visitors
pub const GUEST_NAME: &str = "Guest";

/// Greeting for the local hour of day (0-23)
pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 12 {
        "Good Morning"
    } else if hour < 17 {
        "Good Afternoon"
    } else {
        "Good Evening"
    }
}

/// Greeting for a point in local time
pub fn greeting_at<T: Timelike>(time: &T) -> &'static str {
    greeting_for_hour(time.hour())
}

/// Display name derived from an e-mail address: its local part
pub fn display_name(email: Option<&str>) -> String {
    email
        .and_then(|email| email.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Up to two upper-case initials, one per word
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

/// Long date under the greeting, e.g. "Thursday, October 2, 2025"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
