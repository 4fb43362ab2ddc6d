//! Source apportionment
//!
//! Splits a PM2.5 value over a fixed per-country emission inventory.
//! Reporting only: the transboundary share that drives policy comes from
//! `TransportModel`, not from the wind heuristic here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{round1, Country, Measurement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionSource {
    BrickKilns,
    Vehicles,
    Industries,
    Construction,
    WasteBurning,
    Others,
}

type SourceTable = [(EmissionSource, f64); 6];

const BANGLADESH_SOURCES: SourceTable = [
    (EmissionSource::BrickKilns, 0.35),
    (EmissionSource::Vehicles, 0.25),
    (EmissionSource::Industries, 0.20),
    (EmissionSource::Construction, 0.10),
    (EmissionSource::WasteBurning, 0.05),
    (EmissionSource::Others, 0.05),
];

const INDIA_SOURCES: SourceTable = [
    (EmissionSource::Vehicles, 0.40),
    (EmissionSource::Industries, 0.25),
    (EmissionSource::Construction, 0.15),
    (EmissionSource::WasteBurning, 0.10),
    (EmissionSource::BrickKilns, 0.05),
    (EmissionSource::Others, 0.05),
];

/// Inventory for an ISO country code; unknown codes use the Bangladesh table
pub fn source_table(country_code: &str) -> &'static SourceTable {
    match country_code {
        "IN" => &INDIA_SOURCES,
        _ => &BANGLADESH_SOURCES,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apportionment {
    pub country: Country,
    pub pm25_total: f64,
    pub local_contribution: f64,
    pub local_percentage: f64,
    pub transboundary_contribution: f64,
    pub transboundary_percentage: f64,
    pub source_breakdown: BTreeMap<EmissionSource, f64>,
}

/// Rough wind-only estimate of the imported fraction.
///
/// Bangladesh imports on westerlies (225-315°), India on easterlies (45-135°).
pub fn wind_transboundary_factor(country: Country, wind_speed: f64, wind_direction: f64) -> f64 {
    let strength = (wind_speed / 10.0).min(1.0);
    match country {
        Country::Bangladesh if (225.0..=315.0).contains(&wind_direction) => strength * 0.6,
        Country::Bangladesh => 0.2,
        Country::India if (45.0..=135.0).contains(&wind_direction) => strength * 0.4,
        Country::India => 0.1,
    }
}

pub fn apportion(measurement: &Measurement) -> Apportionment {
    let pm25 = measurement.pm25;
    let factor = wind_transboundary_factor(
        measurement.country,
        measurement.wind_speed.unwrap_or(0.0),
        measurement.wind_direction.unwrap_or(0.0),
    );

    let source_breakdown = source_table(measurement.country.code())
        .iter()
        .map(|(source, fraction)| (*source, round1(pm25 * fraction)))
        .collect();

    Apportionment {
        country: measurement.country,
        pm25_total: pm25,
        local_contribution: round1(pm25 * (1.0 - factor)),
        local_percentage: round1((1.0 - factor) * 100.0),
        transboundary_contribution: round1(pm25 * factor),
        transboundary_percentage: round1(factor * 100.0),
        source_breakdown,
    }
}
