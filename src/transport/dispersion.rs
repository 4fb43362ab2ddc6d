//! Dispersion diagnostics, cross-border transport potential, aerosol
//! loading and local emission estimates

use serde::{Deserialize, Serialize};

use crate::collector::{AerosolObservation, ForecastPoint, RetrievalQuality, TrafficSnapshot};
use crate::domain::{round1, Meteorology};

/// Pasquill-Gifford stability class, B (unstable) to F (very stable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityClass {
    B,
    C,
    D,
    E,
    F,
}

impl StabilityClass {
    pub fn from_wind_speed(wind_speed: f64) -> Self {
        if wind_speed < 2.0 {
            StabilityClass::F
        } else if wind_speed < 3.0 {
            StabilityClass::E
        } else if wind_speed < 5.0 {
            StabilityClass::D
        } else if wind_speed < 6.0 {
            StabilityClass::C
        } else {
            StabilityClass::B
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersionParameters {
    pub stability_class: StabilityClass,
    pub mixing_factor: f64,
    /// m²/s ÷ 1000
    pub ventilation_coefficient: f64,
    pub stagnation_risk: bool,
}

pub fn dispersion_parameters(met: &Meteorology) -> DispersionParameters {
    let ws = met.wind_speed_ms;
    let blh = met.boundary_layer_height_m;
    DispersionParameters {
        stability_class: StabilityClass::from_wind_speed(ws),
        mixing_factor: (blh / 1500.0).min(1.0),
        ventilation_coefficient: ws * blh / 1000.0,
        stagnation_risk: ws < 2.0 && blh < 800.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPotential {
    Low,
    Moderate,
    High,
}

/// Whether current winds favour carrying pollution across the border
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportPotentialAnalysis {
    pub transport_potential: TransportPotential,
    pub wind_direction_deg: f64,
    pub wind_speed_ms: f64,
    /// Wind from the south-east sector (135°-225°)
    pub transport_to_bangladesh: bool,
    /// Wind from the northern sector (315°-45°)
    pub transport_from_bangladesh: bool,
    /// Hours for the air mass to cover the distance to the border
    pub estimated_transport_time_hours: Option<f64>,
    pub boundary_layer_height_m: f64,
    pub favorable_dispersion: bool,
}

/// City centre to the border (km)
const DISTANCE_TO_BORDER_KM: f64 = 50.0;

/// Classify transport potential along the Kolkata-Dhaka corridor.
///
/// Strong wind over a deep mixed layer is `high` inside either corridor
/// sector and `moderate` outside it; otherwise wind above 3 m/s is
/// `moderate` and anything calmer is `low`.
pub fn transport_potential(met: &Meteorology) -> TransportPotentialAnalysis {
    let ws = met.wind_speed_ms;
    let dir = met.wind_direction_deg;
    let blh = met.boundary_layer_height_m;

    let transport_to_bangladesh = (135.0..=225.0).contains(&dir);
    let transport_from_bangladesh = dir >= 315.0 || dir <= 45.0;

    let potential = if ws > 5.0 && blh > 1000.0 {
        if transport_to_bangladesh || transport_from_bangladesh {
            TransportPotential::High
        } else {
            TransportPotential::Moderate
        }
    } else if ws > 3.0 {
        TransportPotential::Moderate
    } else {
        TransportPotential::Low
    };

    let estimated_transport_time_hours =
        (ws > 0.0).then(|| round1(DISTANCE_TO_BORDER_KM / (ws * 3.6)));

    TransportPotentialAnalysis {
        transport_potential: potential,
        wind_direction_deg: dir,
        wind_speed_ms: ws,
        transport_to_bangladesh,
        transport_from_bangladesh,
        estimated_transport_time_hours,
        boundary_layer_height_m: blh,
        favorable_dispersion: blh > 1200.0 && ws > 4.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtmosphericLoading {
    Moderate,
    High,
}

/// AOD above this is reported as high loading
const HIGH_LOADING_AOD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AerosolConditions {
    /// AOD at 550 nm
    pub optical_depth: f64,
    pub atmospheric_loading: AtmosphericLoading,
    pub data_quality: RetrievalQuality,
}

pub fn aerosol_conditions(aerosol: &AerosolObservation) -> AerosolConditions {
    let aod = aerosol.aerosol_optical_depth_550nm;
    AerosolConditions {
        optical_depth: aod,
        atmospheric_loading: if aod > HIGH_LOADING_AOD {
            AtmosphericLoading::High
        } else {
            AtmosphericLoading::Moderate
        },
        data_quality: aerosol.data_quality,
    }
}

/// Fixed non-traffic inventory (kg/h)
const INDUSTRIAL_KG_H: f64 = 15.0;
const RESIDENTIAL_KG_H: f64 = 8.0;
const CONSTRUCTION_KG_H: f64 = 5.0;

const MAX_CONCENTRATION_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalEmissionEstimate {
    pub traffic_kg_hour: f64,
    pub industrial_kg_hour: f64,
    pub residential_kg_hour: f64,
    pub construction_kg_hour: f64,
    pub total_emissions_kg_hour: f64,
    pub meteorological_factor: f64,
    /// Rough µg/m³ equivalent of the local inventory
    pub estimated_concentration_impact: f64,
}

/// Combine traffic emissions with the fixed inventory.
///
/// Weak wind and shallow mixing concentrate emissions, capped at 3x. Without
/// meteorology the factor is 1.
pub fn estimate_local_emissions(
    traffic: &TrafficSnapshot,
    meteorology: Option<&Meteorology>,
) -> LocalEmissionEstimate {
    let traffic_kg_hour = traffic.total_estimated_emissions_kg_hour;
    let total = traffic_kg_hour + INDUSTRIAL_KG_H + RESIDENTIAL_KG_H + CONSTRUCTION_KG_H;

    let factor = meteorology
        .map(|m| {
            let wind = 5.0 / m.wind_speed_ms.max(1.0);
            let mixing = 1000.0 / m.boundary_layer_height_m.max(500.0);
            (wind * mixing).min(MAX_CONCENTRATION_FACTOR)
        })
        .unwrap_or(1.0);

    LocalEmissionEstimate {
        traffic_kg_hour,
        industrial_kg_hour: INDUSTRIAL_KG_H,
        residential_kg_hour: RESIDENTIAL_KG_H,
        construction_kg_hour: CONSTRUCTION_KG_H,
        total_emissions_kg_hour: total,
        meteorological_factor: factor,
        estimated_concentration_impact: total * factor * 0.1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastTrend {
    ImprovingDispersion,
    WorseningDispersion,
    MixedConditions,
    InsufficientData,
}

const MIN_TREND_POINTS: usize = 6;
const TREND_WINDOW: usize = 12;

/// Compare the first and last of the next 12 hourly points
pub fn analyze_forecast_trend(forecast: &[ForecastPoint]) -> ForecastTrend {
    if forecast.len() < MIN_TREND_POINTS {
        return ForecastTrend::InsufficientData;
    }

    let window = &forecast[..forecast.len().min(TREND_WINDOW)];
    let (first, last) = match (window.first(), window.last()) {
        (Some(f), Some(l)) => (f.meteorology, l.meteorology),
        _ => return ForecastTrend::InsufficientData,
    };

    let wind_rising = last.wind_speed_ms > first.wind_speed_ms;
    let mixing_rising = last.boundary_layer_height_m > first.boundary_layer_height_m;

    match (wind_rising, mixing_rising) {
        (true, true) => ForecastTrend::ImprovingDispersion,
        (false, false) => ForecastTrend::WorseningDispersion,
        _ => ForecastTrend::MixedConditions,
    }
}
