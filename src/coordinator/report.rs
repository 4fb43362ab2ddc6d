//! Orchestration input and result records

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::agents::Section;
use crate::coordination::DispatchReport;
use crate::domain::{
    ActionType, Alert, City, CityObservation, Country, Meteorology, PolicyDecision, ProposalDetails,
    ProposalStatus,
};
use crate::transport::{Apportionment, Coefficients, TransportEstimate};
use crate::validation::ValidationResult;

/// Per-city observations for one run; a missing city is reported as `no_data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationContext {
    #[serde(default, alias = "dhaka_data")]
    pub dhaka: Option<CityObservation>,
    #[serde(default, alias = "kolkata_data")]
    pub kolkata: Option<CityObservation>,
}

impl OrchestrationContext {
    pub fn new(dhaka: Option<CityObservation>, kolkata: Option<CityObservation>) -> Self {
        Self { dhaka, kolkata }
    }

    pub fn get(&self, city: City) -> Option<&CityObservation> {
        match city {
            City::Dhaka => self.dhaka.as_ref(),
            City::Kolkata => self.kolkata.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dhaka.is_none() && self.kolkata.is_none()
    }

    /// Built-in context: a westerly winter morning in Dhaka and a clean
    /// easterly in Kolkata
    pub fn demo() -> Self {
        let timestamp = (Utc::now() - ChronoDuration::minutes(5)).to_rfc3339();
        let mut dhaka_met = Meteorology::new(3.5, 270.0, 800.0);
        dhaka_met.temperature_c = Some(28.5);
        dhaka_met.humidity_pct = Some(75.0);
        let mut kolkata_met = Meteorology::new(4.2, 90.0, 1200.0);
        kolkata_met.temperature_c = Some(26.8);
        kolkata_met.humidity_pct = Some(68.0);

        Self {
            dhaka: Some(
                CityObservation::new(139.0, timestamp.clone())
                    .with_country(Country::Bangladesh)
                    .with_meteorology(dhaka_met),
            ),
            kolkata: Some(
                CityObservation::new(45.6, timestamp)
                    .with_country(Country::India)
                    .with_meteorology(kolkata_met),
            ),
        }
    }
}

/// Validate → apportion → transport → policy for one city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityAssessment {
    pub city: City,
    pub country: Country,
    pub pm25: f64,
    pub timestamp: String,
    pub validation: ValidationResult,
    pub emission_analysis: Apportionment,
    pub transport: Section<TransportEstimate>,
    /// Adjusted coefficients, or the static base pair without meteorology
    pub effective_coefficients: Coefficients,
    pub transboundary_percent: f64,
    pub policy: PolicyDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CityOutcome {
    Success(Box<CityAssessment>),
    NoData {
        city: City,
    },
    ValidationFailed {
        city: City,
        errors: Vec<String>,
        warnings: Vec<String>,
    },
    Error {
        city: City,
        error: String,
    },
}

impl CityOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            CityOutcome::Success(_) => "success",
            CityOutcome::NoData { .. } => "no_data",
            CityOutcome::ValidationFailed { .. } => "validation_failed",
            CityOutcome::Error { .. } => "error",
        }
    }

    pub fn assessment(&self) -> Option<&CityAssessment> {
        match self {
            CityOutcome::Success(assessment) => Some(assessment),
            _ => None,
        }
    }

    /// Whether this city asks for cross-border coordination
    pub fn needs_coordination(&self) -> bool {
        self.assessment()
            .map(|a| a.policy.cross_border_coordination_needed)
            .unwrap_or(false)
    }
}

/// A proposal opened during the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedAction {
    pub proposal_id: String,
    pub action_type: ActionType,
    pub status: ProposalStatus,
    pub participating_countries: Vec<Country>,
    pub details: ProposalDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoordinationOutcome {
    NotNeeded,
    Success {
        coordinated_actions: Vec<CoordinatedAction>,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
    },
}

impl CoordinationOutcome {
    pub fn coordinated_actions(&self) -> &[CoordinatedAction] {
        match self {
            CoordinationOutcome::Success {
                coordinated_actions,
                ..
            } => coordinated_actions,
            _ => &[],
        }
    }
}

/// An alert and its per-country delivery results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedAlert {
    pub alert: Alert,
    pub distribution: BTreeMap<Country, DispatchReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationReport {
    pub timestamp: DateTime<Utc>,
    pub processing_time_seconds: f64,
    pub cities: BTreeMap<City, CityOutcome>,
    pub cross_border_coordination: CoordinationOutcome,
    pub alerts: Vec<IssuedAlert>,
}

impl OrchestrationReport {
    pub fn city(&self, city: City) -> Option<&CityOutcome> {
        self.cities.get(&city)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrchestrationResult {
    Success(Box<OrchestrationReport>),
    Error {
        error: String,
        timestamp: DateTime<Utc>,
        processing_time_seconds: f64,
    },
}

impl OrchestrationResult {
    pub fn status(&self) -> &'static str {
        match self {
            OrchestrationResult::Success(_) => "success",
            OrchestrationResult::Error { .. } => "error",
        }
    }

    pub fn report(&self) -> Option<&OrchestrationReport> {
        match self {
            OrchestrationResult::Success(report) => Some(report),
            OrchestrationResult::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_accepts_legacy_keys() {
        let ctx: OrchestrationContext = serde_json::from_str(
            r#"{
                "dhaka_data": {"pm25": 139.0, "timestamp": "2025-01-15T08:00:00Z"},
                "kolkata_data": null
            }"#,
        )
        .unwrap();
        assert_eq!(ctx.get(City::Dhaka).map(|o| o.pm25), Some(139.0));
        assert!(ctx.get(City::Kolkata).is_none());
        assert!(!ctx.is_empty());
    }

    #[test]
    fn test_outcome_status_tags() {
        let outcome = CityOutcome::NoData { city: City::Kolkata };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "no_data");
        assert!(!outcome.needs_coordination());

        let json = serde_json::to_value(CoordinationOutcome::NotNeeded).unwrap();
        assert_eq!(json["status"], "not_needed");
    }

    #[test]
    fn test_demo_context_has_both_cities() {
        let ctx = OrchestrationContext::demo();
        assert!(ctx.dhaka.as_ref().and_then(|o| o.meteorology).is_some());
        assert_eq!(ctx.kolkata.as_ref().map(|o| o.pm25), Some(45.6));
    }
}
