//! Reading sources
//!
//! `ReadingSource` is the seam between the collector and whatever actually
//! talks to a station. The simulated implementation stands in for the
//! network APIs; tests use the doubles in `collector::mock`.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{round1, Country, SensorConfig};
use crate::error::{AqmsError, Result};

/// Uncalibrated values as reported by a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// ISO-8601 as reported by the station
    pub timestamp: String,
    pub pm25: f64,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

impl RawReading {
    /// Reading stamped with the current time
    pub fn now(pm25: f64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            pm25,
            pm10: None,
            temperature: None,
            humidity: None,
            wind_speed: None,
            wind_direction: None,
        }
    }
}

/// Fetch one reading from the station described by `sensor`
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch(&self, sensor: &SensorConfig) -> Result<RawReading>;
}

/// Random readings around a per-city baseline, after a simulated network delay
#[derive(Debug, Clone)]
pub struct SimulatedSensorSource {
    delay: Duration,
    failure_rate: f64,
}

impl SimulatedSensorSource {
    pub fn new(delay: Duration, failure_rate: f64) -> Self {
        Self {
            delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    fn baseline_pm25(country: Country) -> f64 {
        match country {
            Country::Bangladesh => 120.0,
            Country::India => 85.0,
        }
    }
}

impl Default for SimulatedSensorSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 0.0)
    }
}

#[async_trait]
impl ReadingSource for SimulatedSensorSource {
    async fn fetch(&self, sensor: &SensorConfig) -> Result<RawReading> {
        tokio::time::sleep(self.delay).await;

        let mut rng = rand::thread_rng();
        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            return Err(AqmsError::SourceUnavailable {
                source_id: sensor.station_id.clone(),
                reason: "simulated upstream failure".to_string(),
            });
        }

        let pm25 = (Self::baseline_pm25(sensor.country) + rng.gen_range(-30.0..50.0)).max(0.0);
        let pm10 = if rng.gen_bool(0.7) {
            Some(round1(pm25 * 1.5))
        } else {
            None
        };

        Ok(RawReading {
            timestamp: Utc::now().to_rfc3339(),
            pm25,
            pm10,
            temperature: Some(round1(rng.gen_range(20.0..35.0))),
            humidity: Some(round1(rng.gen_range(60.0..90.0))),
            wind_speed: Some(round1(rng.gen_range(1.0..8.0))),
            wind_direction: Some(rng.gen_range(0.0_f64..360.0).round()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::network_for;
    use crate::domain::City;

    #[tokio::test]
    async fn test_simulated_source_stays_in_range() {
        let source = SimulatedSensorSource::new(Duration::from_millis(0), 0.0);
        let sensor = &network_for(City::Dhaka)[0];
        for _ in 0..20 {
            let reading = source.fetch(sensor).await.unwrap();
            assert!(reading.pm25 >= 90.0 && reading.pm25 <= 170.0);
            let temp = reading.temperature.unwrap();
            assert!((20.0..=35.0).contains(&temp));
        }
    }

    #[test]
    fn test_simulated_source_always_failing() {
        let source = SimulatedSensorSource::new(Duration::from_millis(0), 1.0);
        let sensor = &network_for(City::Kolkata)[0];
        let err = tokio_test::block_on(source.fetch(sensor)).unwrap_err();
        assert!(err.is_source_failure());
    }
}
