//! Transboundary transport model
//!
//! `PM2.5 = α·local + β·transboundary`
//!
//! Each country has static base coefficients (α, β). Meteorology sets a
//! transport efficiency `e` in [0.1, 0.9]; the coefficients are rescaled to
//! `α(1 - e)` and `βe` and renormalised so that they always sum to 1.

use serde::{Deserialize, Serialize};

use crate::domain::{Country, Meteorology};

/// Below this wind speed (m/s) there is no meaningful transport
pub const MIN_TRANSPORT_WIND_MS: f64 = 0.5;

const MIN_EFFICIENCY: f64 = 0.1;
const MAX_EFFICIENCY: f64 = 0.9;

/// (local, transboundary) pair; the two fields always sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub local: f64,
    pub transboundary: f64,
}

impl Coefficients {
    /// Static base coefficients per country
    pub fn base(country: Country) -> Self {
        match country {
            Country::Bangladesh => Self {
                local: 0.38,
                transboundary: 0.62,
            },
            Country::India => Self {
                local: 0.55,
                transboundary: 0.45,
            },
        }
    }

    pub fn transboundary_percent(&self) -> f64 {
        self.transboundary * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEstimate {
    pub country: Country,
    pub base_coefficients: Coefficients,
    pub adjusted_coefficients: Coefficients,
    pub transport_efficiency: f64,
    /// `None` when the wind is too weak to carry pollution across
    pub transport_time_hours: Option<f64>,
    pub meteorology: Meteorology,
}

/// Stateless; one instance can serve both countries
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportModel;

impl TransportModel {
    pub fn new() -> Self {
        Self
    }

    pub fn model_transport(&self, meteorology: &Meteorology, country: Country) -> TransportEstimate {
        let base = Coefficients::base(country);
        let efficiency = transport_efficiency(
            meteorology.wind_speed_ms,
            meteorology.wind_direction_deg,
            meteorology.boundary_layer_height_m,
            country,
        );

        TransportEstimate {
            country,
            base_coefficients: base,
            adjusted_coefficients: adjust(base, efficiency),
            transport_efficiency: efficiency,
            transport_time_hours: transport_time_hours(meteorology.wind_speed_ms, country),
            meteorology: *meteorology,
        }
    }
}

fn adjust(base: Coefficients, efficiency: f64) -> Coefficients {
    let local = base.local * (1.0 - efficiency);
    let transboundary = base.transboundary * efficiency;
    let total = local + transboundary;
    // efficiency is clamped away from 0 and 1, so total > 0 for positive bases
    if total > 0.0 {
        Coefficients {
            local: local / total,
            transboundary: 1.0 - local / total,
        }
    } else {
        base
    }
}

/// Step function of wind speed (m/s)
pub fn base_efficiency(wind_speed: f64) -> f64 {
    if wind_speed < 1.0 {
        0.1
    } else if wind_speed < 3.0 {
        0.3
    } else if wind_speed < 6.0 {
        0.6
    } else {
        0.8
    }
}

/// 1.0 when the wind blows from the neighbour, 0.2 when it blows towards it
pub fn direction_factor(wind_direction: f64, country: Country) -> f64 {
    let westerly = (225.0..=315.0).contains(&wind_direction);
    let easterly = (45.0..=135.0).contains(&wind_direction);
    let (inbound, outbound) = match country {
        Country::Bangladesh => (westerly, easterly),
        Country::India => (easterly, westerly),
    };

    if inbound {
        1.0
    } else if outbound {
        0.2
    } else {
        0.5
    }
}

/// Shallow mixing layers trap pollution and favour transport
pub fn boundary_layer_factor(height_m: f64) -> f64 {
    if height_m < 500.0 {
        1.2
    } else if height_m < 1000.0 {
        1.0
    } else {
        0.8
    }
}

pub fn transport_efficiency(
    wind_speed: f64,
    wind_direction: f64,
    boundary_layer_height: f64,
    country: Country,
) -> f64 {
    let efficiency = base_efficiency(wind_speed)
        * direction_factor(wind_direction, country)
        * boundary_layer_factor(boundary_layer_height);
    efficiency.clamp(MIN_EFFICIENCY, MAX_EFFICIENCY)
}

/// Approximate distance from the city to the border (km)
pub fn border_distance_km(country: Country) -> f64 {
    match country {
        Country::Bangladesh => 50.0,
        Country::India => 80.0,
    }
}

pub fn transport_time_hours(wind_speed: f64, country: Country) -> Option<f64> {
    if wind_speed.is_nan() || wind_speed < MIN_TRANSPORT_WIND_MS {
        return None;
    }
    Some(border_distance_km(country) / (wind_speed * 3.6))
}
