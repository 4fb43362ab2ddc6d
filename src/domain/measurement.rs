use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::country::Country;

/// WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Instrument fitted at a monitoring site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    /// Beta attenuation monitor (reference grade)
    Bam,
    /// Tapered element oscillating microbalance (reference grade)
    Teom,
    /// Low-cost optical particle counter
    PurpleAir,
    Satellite,
    Model,
}

impl InstrumentType {
    /// Optical counters over-read in humid air and need a correction factor
    pub fn is_optical(&self) -> bool {
        matches!(self, InstrumentType::PurpleAir)
    }
}

/// Origin classification carried on every measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Government,
    LowCost,
    Satellite,
    Model,
}

impl From<InstrumentType> for MeasurementType {
    fn from(instrument: InstrumentType) -> Self {
        match instrument {
            InstrumentType::Bam | InstrumentType::Teom => MeasurementType::Government,
            InstrumentType::PurpleAir => MeasurementType::LowCost,
            InstrumentType::Satellite => MeasurementType::Satellite,
            InstrumentType::Model => MeasurementType::Model,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingLevel {
    Raw,
    Validated,
    Calibrated,
    Harmonized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Valid,
    Questionable,
    Invalid,
}

/// Static description of one monitoring site.
///
/// Built once when a collector's network is assembled and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub station_id: String,
    pub station_name: String,
    pub country: Country,
    pub coordinate: Coordinate,
    pub instrument: InstrumentType,
    pub calibration_factor: f64,
    pub is_active: bool,
}

impl SensorConfig {
    pub fn new(
        station_id: impl Into<String>,
        station_name: impl Into<String>,
        country: Country,
        coordinate: Coordinate,
        instrument: InstrumentType,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            station_name: station_name.into(),
            country,
            coordinate,
            instrument,
            calibration_factor: 1.0,
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn category(&self) -> MeasurementType {
        self.instrument.into()
    }

    pub fn source_agency(&self) -> String {
        match self.category() {
            MeasurementType::Government => self.country.source_agency().to_string(),
            MeasurementType::LowCost => "PurpleAir Community Network".to_string(),
            MeasurementType::Satellite => "Satellite Retrieval".to_string(),
            MeasurementType::Model => "Regional Model Output".to_string(),
        }
    }
}

/// Single station reading.
///
/// Produced by a collector, annotated once by the validator, then owned by the
/// pipeline. `timestamp` keeps the ISO-8601 text as received so that
/// unparsable values can be rejected by validation instead of at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub measurement_id: String,
    pub station_id: String,
    pub country: Country,
    pub timestamp: String,
    pub coordinate: Coordinate,
    /// PM2.5 in µg/m³
    pub pm25: f64,
    pub pm10: Option<f64>,
    /// °C
    pub temperature: Option<f64>,
    /// Relative humidity %
    pub humidity: Option<f64>,
    /// m/s
    pub wind_speed: Option<f64>,
    /// Degrees, direction the wind blows from
    pub wind_direction: Option<f64>,
    pub measurement_type: MeasurementType,
    pub source_agency: String,
    pub processing_level: ProcessingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality: Option<DataQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl Measurement {
    /// Parse `timestamp` as UTC. Offset-less values are taken as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Accepts RFC 3339 (`2025-01-15T08:00:00Z`, `...+06:00`) and naive
/// ISO-8601 (`2025-01-15T08:00:00.123`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

/// Surface meteorology relevant to transport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Meteorology {
    pub wind_speed_ms: f64,
    pub wind_direction_deg: f64,
    #[serde(default = "default_boundary_layer")]
    pub boundary_layer_height_m: f64,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
    #[serde(default)]
    pub surface_pressure_hpa: Option<f64>,
}

fn default_boundary_layer() -> f64 {
    1000.0
}

impl Meteorology {
    pub fn new(wind_speed_ms: f64, wind_direction_deg: f64, boundary_layer_height_m: f64) -> Self {
        Self {
            wind_speed_ms,
            wind_direction_deg,
            boundary_layer_height_m,
            temperature_c: None,
            humidity_pct: None,
            surface_pressure_hpa: None,
        }
    }
}

/// City-level snapshot handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityObservation {
    pub pm25: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meteorology: Option<Meteorology>,
}

impl CityObservation {
    pub fn new(pm25: f64, timestamp: impl Into<String>) -> Self {
        Self {
            pm25,
            timestamp: timestamp.into(),
            country: None,
            temperature: None,
            meteorology: None,
        }
    }

    pub fn with_meteorology(mut self, meteorology: Meteorology) -> Self {
        self.meteorology = Some(meteorology);
        self
    }

    pub fn with_country(mut self, country: Country) -> Self {
        self.country = Some(country);
        self
    }

    /// View the snapshot as a city-aggregate measurement for validation
    pub fn to_measurement(&self, country: Country) -> Measurement {
        let city = country.city();
        Measurement {
            measurement_id: format!("{}_{}", city.name().to_ascii_uppercase(), self.timestamp),
            station_id: format!("{}_AGGREGATE", country.code()),
            country,
            timestamp: self.timestamp.clone(),
            coordinate: city_centre(country),
            pm25: self.pm25,
            pm10: None,
            temperature: self
                .temperature
                .or_else(|| self.meteorology.and_then(|m| m.temperature_c)),
            humidity: self.meteorology.and_then(|m| m.humidity_pct),
            wind_speed: self.meteorology.map(|m| m.wind_speed_ms),
            wind_direction: self.meteorology.map(|m| m.wind_direction_deg),
            measurement_type: MeasurementType::Government,
            source_agency: country.source_agency().to_string(),
            processing_level: ProcessingLevel::Harmonized,
            calibration_factor: None,
            data_quality: None,
            quality_score: None,
        }
    }
}

/// Round to one decimal place, the precision reported by the stations
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn city_centre(country: Country) -> Coordinate {
    match country {
        Country::Bangladesh => Coordinate::new(23.8103, 90.4125),
        Country::India => Coordinate::new(22.5726, 88.3639),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-01-15T08:00:00Z").is_some());
        assert!(parse_timestamp("2025-01-15T08:00:00+06:00").is_some());
        assert!(parse_timestamp("2025-01-15T08:00:00.123456").is_some());
        assert!(parse_timestamp("2025-01-15T08:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_offset_normalised_to_utc() {
        let ts = parse_timestamp("2025-01-15T08:00:00+06:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T02:00:00+00:00");
    }

    #[test]
    fn test_instrument_classification() {
        assert_eq!(MeasurementType::from(InstrumentType::Bam), MeasurementType::Government);
        assert_eq!(MeasurementType::from(InstrumentType::PurpleAir), MeasurementType::LowCost);
        assert!(InstrumentType::PurpleAir.is_optical());
        assert!(!InstrumentType::Teom.is_optical());
    }

    #[test]
    fn test_observation_carries_meteorology_into_measurement() {
        let obs = CityObservation::new(139.0, "2025-01-15T08:00:00Z")
            .with_meteorology(Meteorology::new(3.5, 270.0, 800.0));
        let m = obs.to_measurement(Country::Bangladesh);
        assert_eq!(m.country, Country::Bangladesh);
        assert_eq!(m.wind_speed, Some(3.5));
        assert_eq!(m.wind_direction, Some(270.0));
        assert_eq!(m.pm25, 139.0);
    }

    #[test]
    fn test_observation_deserializes_without_meteorology() {
        let obs: CityObservation =
            serde_json::from_str(r#"{"pm25": 45.6, "timestamp": "2025-01-15T08:00:00Z"}"#).unwrap();
        assert!(obs.meteorology.is_none());
        assert!(obs.country.is_none());
    }
}
