//! Dashboard feed
//!
//! Cards shown on the main screen, grouped into sections. Each card kind
//! carries the measurements it displays; everything a card renders (type
//! label, date, action text, level ratio) is derived here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format of card dates as stored
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Priority of a dashboard card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Needs attention now
    High,
    /// Worth watching
    Medium,
    /// Informational
    Low,
}

impl Severity {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Badge text, e.g. `HIGH`
    pub fn badge(&self) -> String {
        self.as_str().to_uppercase()
    }
}

/// What a card reports, with the values specific to that kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    /// Water level approaching or above the danger mark
    FloodAlert {
        /// Current level in metres
        water_level: f64,
        /// Danger mark in metres
        danger_level: f64,
    },
    /// Connectivity or maintenance status of a monitoring site
    SiteStatus {
        /// Human-readable age of the last reading, e.g. "2 hours ago"
        last_reading: String,
    },
    /// A captured water level reading
    Reading {
        /// Level in metres
        water_level: f64,
        /// Who recorded it
        field_personnel: String,
    },
}

impl CardKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::FloodAlert { .. } => "flood_alert",
            CardKind::SiteStatus { .. } => "site_status",
            CardKind::Reading { .. } => "reading",
        }
    }

    /// Label shown under the card title
    pub fn label(&self) -> &'static str {
        match self {
            CardKind::FloodAlert { .. } => "Flood Alert",
            CardKind::SiteStatus { .. } => "Site Status",
            CardKind::Reading { .. } => "Water Reading",
        }
    }

    /// Footer action text
    pub fn action(&self) -> &'static str {
        match self {
            CardKind::FloodAlert { .. } => "View Details →",
            CardKind::SiteStatus { .. } => "Check Site →",
            CardKind::Reading { .. } => "View Reading →",
        }
    }
}

/// One card in the dashboard feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCard {
    /// Card id, unique within the feed
    pub id: u32,
    /// Title
    pub title: String,
    /// Body text
    pub description: String,
    /// River and station, e.g. "Ganges River - Patna"
    pub location: String,
    /// Date as `YYYY-MM-DD`
    pub date: String,
    /// Priority
    pub severity: Severity,
    /// Kind and kind-specific values
    #[serde(flatten)]
    pub kind: CardKind,
}

impl DashboardCard {
    /// Date as shown on the card, e.g. "Oct 2"
    ///
    /// A date that does not parse is shown as stored.
    pub fn display_date(&self) -> String {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map(|date| date.format("%b %-d").to_string())
            .unwrap_or_else(|_| self.date.clone())
    }

    /// Current water level, for the kinds that report one
    pub fn water_level(&self) -> Option<f64> {
        match &self.kind {
            CardKind::FloodAlert { water_level, .. } | CardKind::Reading { water_level, .. } => {
                Some(*water_level)
            }
            CardKind::SiteStatus { .. } => None,
        }
    }

    /// Water level as a percentage of the danger mark
    pub fn danger_ratio_percent(&self) -> Option<f64> {
        match &self.kind {
            CardKind::FloodAlert {
                water_level,
                danger_level,
            } if *danger_level > 0.0 => Some(water_level / danger_level * 100.0),
            _ => None,
        }
    }
}

/// Titled group of cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSection {
    /// Section heading
    pub title: String,
    /// Line under the heading
    pub subtitle: String,
    /// Cards in display order
    pub cards: Vec<DashboardCard>,
}

/// Thirty-day summary figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStats {
    /// Readings collected
    pub total_readings: u32,
    /// Sites reporting
    pub active_sites: u32,
    /// Areas flagged as high risk
    pub high_risk_areas: u32,
    /// Share of readings that passed validation, in percent
    pub data_accuracy: f64,
}

impl MonitoringStats {
    /// Figures shown until live statistics are wired in
    pub fn sample() -> Self {
        Self {
            total_readings: 1247,
            active_sites: 42,
            high_risk_areas: 5,
            data_accuracy: 98.5,
        }
    }
}

fn card(
    id: u32,
    title: &str,
    description: &str,
    location: &str,
    date: &str,
    severity: Severity,
    kind: CardKind,
) -> DashboardCard {
    DashboardCard {
        id,
        title: title.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        date: date.to_string(),
        severity,
        kind,
    }
}

/// Feed shown until the backend serves live data
pub fn sample_feed() -> Vec<DashboardSection> {
    vec![
        DashboardSection {
            title: "Flood Alert Status".to_string(),
            subtitle: "Real-time water level monitoring".to_string(),
            cards: vec![
                card(
                    1,
                    "High Water Level Alert",
                    "Water level approaching danger mark at gauge station",
                    "Brahmaputra River - Guwahati",
                    "2025-10-02",
                    Severity::High,
                    CardKind::FloodAlert {
                        water_level: 142.5,
                        danger_level: 145.0,
                    },
                ),
                card(
                    2,
                    "Rising Water Levels",
                    "Steady increase in water level due to upstream rainfall",
                    "Ganges River - Patna",
                    "2025-10-02",
                    Severity::Medium,
                    CardKind::FloodAlert {
                        water_level: 48.2,
                        danger_level: 50.0,
                    },
                ),
            ],
        },
        DashboardSection {
            title: "Monitoring Sites Status".to_string(),
            subtitle: "Site connectivity and maintenance".to_string(),
            cards: vec![
                card(
                    3,
                    "Site Connectivity Issue",
                    "Data transmission interrupted from monitoring station",
                    "Yamuna River - Delhi",
                    "2025-10-01",
                    Severity::Medium,
                    CardKind::SiteStatus {
                        last_reading: "12 hours ago".to_string(),
                    },
                ),
                card(
                    4,
                    "Calibration Required",
                    "Gauge post needs recalibration after maintenance",
                    "Godavari River - Nashik",
                    "2025-10-01",
                    Severity::Low,
                    CardKind::SiteStatus {
                        last_reading: "2 hours ago".to_string(),
                    },
                ),
            ],
        },
        DashboardSection {
            title: "Recent Water Level Readings".to_string(),
            subtitle: "Latest data collection".to_string(),
            cards: vec![card(
                5,
                "Latest Water Level Reading",
                "Automated reading captured via HydroSnap mobile app",
                "Narmada River - Bhopal",
                "2025-10-02",
                Severity::Low,
                CardKind::Reading {
                    water_level: 35.8,
                    field_personnel: "Rajesh Kumar".to_string(),
                },
            )],
        },
    ]
}
