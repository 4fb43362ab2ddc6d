use serde::{Deserialize, Serialize};

use super::country::Country;

/// Air-quality category, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityCategory {
    Good,
    Moderate,
    Poor,
    Severe,
    Emergency,
}

impl AirQualityCategory {
    pub const ALL: [AirQualityCategory; 5] = [
        AirQualityCategory::Good,
        AirQualityCategory::Moderate,
        AirQualityCategory::Poor,
        AirQualityCategory::Severe,
        AirQualityCategory::Emergency,
    ];

    /// Severe or emergency: the levels that trigger alerts and coordination
    pub fn is_critical(&self) -> bool {
        *self >= AirQualityCategory::Severe
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => "good",
            AirQualityCategory::Moderate => "moderate",
            AirQualityCategory::Poor => "poor",
            AirQualityCategory::Severe => "severe",
            AirQualityCategory::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interventions a jurisdiction can order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    BrickKilnShutdown,
    OddEvenVehicles,
    SchoolClosure,
    ConstructionHalt,
    StreetWatering,
    PublicAdvisory,
    IndustrialAudit,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::BrickKilnShutdown => "brick_kiln_shutdown",
            PolicyAction::OddEvenVehicles => "odd_even_vehicles",
            PolicyAction::SchoolClosure => "school_closure",
            PolicyAction::ConstructionHalt => "construction_halt",
            PolicyAction::StreetWatering => "street_watering",
            PolicyAction::PublicAdvisory => "public_advisory",
            PolicyAction::IndustrialAudit => "industrial_audit",
        }
    }
}

impl std::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedImpact {
    Moderate,
    Significant,
}

/// Outcome of a policy lookup. Pure data, so equal inputs compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub country: Country,
    pub pm25_level: f64,
    pub air_quality_category: AirQualityCategory,
    pub recommended_actions: Vec<PolicyAction>,
    pub transboundary_contribution_percent: f64,
    pub cross_border_coordination_needed: bool,
    pub implementation_priority: Priority,
    pub expected_impact: ExpectedImpact,
}
