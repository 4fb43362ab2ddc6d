//! Result records returned by the city agents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::{
    AerosolObservation, AtmosphericProfile, ForecastPoint, NetworkStatus, SourceFailure,
    TrafficSnapshot,
};
use crate::coordination::CityAggregate;
use crate::domain::{City, CityObservation, Measurement, Meteorology};
use crate::error::AqmsError;
use crate::transport::{
    AerosolConditions, DispersionParameters, ForecastTrend, LocalEmissionEstimate, TransportEstimate,
    TransportPotentialAnalysis,
};
use crate::validation::{BatchValidationSummary, Rejection};

/// Optional part of a report that depends on a degradable input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Available { data: T },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn from_result(result: Result<T, AqmsError>) -> Self {
        match result {
            Ok(data) => Section::Available { data },
            Err(e) => Section::unavailable(e.to_string()),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Available { data } => Some(data),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available { .. })
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Section<U> {
        match self {
            Section::Available { data } => Section::Available { data: f(data) },
            Section::Unavailable { reason } => Section::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub hours_available: usize,
    pub trend: ForecastTrend,
    pub points: Vec<ForecastPoint>,
}

/// Satellite retrieval for the city; the profile degrades on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteData {
    pub aerosol: AerosolObservation,
    pub aerosol_conditions: AerosolConditions,
    pub atmospheric_profile: Section<AtmosphericProfile>,
}

/// Outcome of draining the agent's inbox
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeighborExchange {
    pub received: usize,
    pub accepted: usize,
    /// One reason per dropped message
    pub rejected: Vec<String>,
    /// Most recent accepted neighbour aggregate, kept across rounds
    pub latest: Option<CityAggregate>,
}

/// Successful collection round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub city: City,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub raw_measurements: usize,
    pub failed_sources: Vec<SourceFailure>,
    pub validation: BatchValidationSummary,
    pub rejected: Vec<Rejection>,
    pub measurements: Vec<Measurement>,
    pub aggregate: CityAggregate,
    /// Orchestrator input derived from this round
    pub observation: CityObservation,
    pub shared_with_neighbor: bool,
    pub sensor_status: NetworkStatus,
    pub meteorology: Section<Meteorology>,
    pub dispersion: Section<DispersionParameters>,
    pub forecast: Section<ForecastSummary>,
    pub traffic: Section<TrafficSnapshot>,
    pub local_emissions: Section<LocalEmissionEstimate>,
    pub transport: Section<TransportEstimate>,
    pub transport_potential: Section<TransportPotentialAnalysis>,
    pub satellite_data: Section<SatelliteData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionResult {
    Success(Box<CollectionReport>),
    NoData {
        city: City,
        reason: String,
        failed_sources: Vec<SourceFailure>,
        timestamp: DateTime<Utc>,
    },
    ValidationFailed {
        city: City,
        validation: BatchValidationSummary,
        rejected: Vec<Rejection>,
        timestamp: DateTime<Utc>,
    },
    Error {
        city: City,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl CollectionResult {
    pub fn status(&self) -> &'static str {
        match self {
            CollectionResult::Success(_) => "success",
            CollectionResult::NoData { .. } => "no_data",
            CollectionResult::ValidationFailed { .. } => "validation_failed",
            CollectionResult::Error { .. } => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CollectionResult::Success(_))
    }

    pub fn report(&self) -> Option<&CollectionReport> {
        match self {
            CollectionResult::Success(report) => Some(report),
            _ => None,
        }
    }

    /// Aggregate observation usable as orchestrator input
    pub fn observation(&self) -> Option<&CityObservation> {
        self.report().map(|r| &r.observation)
    }
}

/// Per-agent collection counters, updated once at the end of every round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_collections: u64,
    pub successful_collections: u64,
    /// Rolling mean of valid measurements per successful round
    pub average_measurements_per_collection: f64,
    pub last_collection: Option<DateTime<Utc>>,
}

impl CollectionStats {
    pub fn record(&mut self, result: &CollectionResult) {
        self.total_collections += 1;
        self.last_collection = Some(Utc::now());
        if let Some(report) = result.report() {
            self.successful_collections += 1;
            let n = self.successful_collections as f64;
            let count = report.measurements.len() as f64;
            self.average_measurements_per_collection =
                (self.average_measurements_per_collection * (n - 1.0) + count) / n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_serializes_with_status() {
        let available: Section<Meteorology> = Section::Available {
            data: Meteorology::new(3.0, 270.0, 900.0),
        };
        let json = serde_json::to_value(&available).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["data"]["wind_speed_ms"], 3.0);

        let missing: Section<Meteorology> = Section::from_result(Err(AqmsError::ModelInputMissing(
            "meteorology feed unavailable".to_string(),
        )));
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert!(json["reason"].as_str().unwrap().contains("meteorology"));
    }

    #[test]
    fn test_result_status_tag() {
        let result = CollectionResult::NoData {
            city: City::Kolkata,
            reason: "all sources failed".to_string(),
            failed_sources: Vec::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["city"], "kolkata");
        assert_eq!(result.status(), "no_data");
    }

    #[test]
    fn test_stats_count_failures() {
        let mut stats = CollectionStats::default();
        stats.record(&CollectionResult::Error {
            city: City::Dhaka,
            error: "boom".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(stats.total_collections, 1);
        assert_eq!(stats.successful_collections, 0);
        assert!(stats.last_collection.is_some());
    }
}
