use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::country::{City, Country};
use super::policy::{AirQualityCategory, PolicyAction};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Moderate,
    High,
    Emergency,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Moderate => "moderate",
            AlertSeverity::High => "high",
            AlertSeverity::Emergency => "emergency",
        }
    }

    /// Colour shown on roadside billboards
    pub fn color_code(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "GREEN",
            AlertSeverity::Moderate => "YELLOW",
            AlertSeverity::High => "ORANGE",
            AlertSeverity::Emergency => "RED",
        }
    }
}

impl From<AirQualityCategory> for AlertSeverity {
    fn from(category: AirQualityCategory) -> Self {
        match category {
            AirQualityCategory::Emergency => AlertSeverity::Emergency,
            AirQualityCategory::Severe => AlertSeverity::High,
            AirQualityCategory::Poor => AlertSeverity::Moderate,
            AirQualityCategory::Moderate | AirQualityCategory::Good => AlertSeverity::Low,
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PollutionSpike,
    TransboundaryTransport,
}

/// Public-facing text in each supported language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedMessages {
    pub english: String,
    pub bengali: String,
    pub hindi: String,
}

/// Per-city transport figures attached to a transboundary alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTransport {
    pub city: City,
    pub pm25: f64,
    pub transboundary_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub alert_type: AlertKind,
    pub severity: AlertSeverity,
    pub timestamp: DateTime<Utc>,
    pub origin_country: Country,
    pub affected_countries: Vec<Country>,
    pub affected_cities: Vec<City>,
    pub current_pm25: f64,
    /// Short-horizon outlook, one value per step
    pub forecast_pm25: Vec<f64>,
    pub transboundary_contribution_percent: f64,
    pub recommended_actions: Vec<PolicyAction>,
    pub coordination_required: bool,
    pub messages: LocalizedMessages,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transport: Vec<CityTransport>,
}
