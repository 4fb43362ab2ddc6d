//! Deterministic doubles for the collector and feed seams.
//!
//! Compiled for unit tests and behind the `test-util` feature for downstream
//! crates that drive the pipeline without the random simulators.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::feeds::{
    AerosolObservation, AtmosphericProfile, ForecastPoint, MeteorologyFeed, SatelliteFeed,
    TrafficFeed, TrafficSnapshot,
};
use super::source::{RawReading, ReadingSource};
use crate::domain::{Meteorology, SensorConfig};
use crate::error::{AqmsError, Result};

/// Every sensor reports the same PM2.5
#[derive(Debug, Clone)]
pub struct FixedReadingSource {
    pm25: f64,
}

impl FixedReadingSource {
    pub fn new(pm25: f64) -> Self {
        Self { pm25 }
    }
}

#[async_trait]
impl ReadingSource for FixedReadingSource {
    async fn fetch(&self, _sensor: &SensorConfig) -> Result<RawReading> {
        let mut reading = RawReading::now(self.pm25);
        reading.temperature = Some(28.0);
        Ok(reading)
    }
}

/// Every fetch fails
#[derive(Debug, Clone, Default)]
pub struct FailingSource;

#[async_trait]
impl ReadingSource for FailingSource {
    async fn fetch(&self, sensor: &SensorConfig) -> Result<RawReading> {
        Err(AqmsError::SourceUnavailable {
            source_id: sensor.station_id.clone(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Never answers within any reasonable timeout
#[derive(Debug, Clone)]
pub struct StalledSource {
    stall: Duration,
}

impl StalledSource {
    pub fn new(stall: Duration) -> Self {
        Self { stall }
    }
}

#[async_trait]
impl ReadingSource for StalledSource {
    async fn fetch(&self, _sensor: &SensorConfig) -> Result<RawReading> {
        tokio::time::sleep(self.stall).await;
        Ok(RawReading::now(0.0))
    }
}

/// Per-station readings and failures, with a default for everything else
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    default_pm25: f64,
    readings: HashMap<String, RawReading>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
}

impl ScriptedSource {
    pub fn new(default_pm25: f64) -> Self {
        Self {
            default_pm25,
            ..Self::default()
        }
    }

    pub fn with_reading(mut self, station_id: impl Into<String>, reading: RawReading) -> Self {
        self.readings.insert(station_id.into(), reading);
        self
    }

    pub fn failing_for<I, S>(mut self, station_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(station_ids.into_iter().map(Into::into));
        self
    }

    /// Stations whose fetch panics, to exercise task isolation
    pub fn panicking_for<I, S>(mut self, station_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.panicking.extend(station_ids.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl ReadingSource for ScriptedSource {
    async fn fetch(&self, sensor: &SensorConfig) -> Result<RawReading> {
        if self.panicking.contains(&sensor.station_id) {
            panic!("scripted panic for {}", sensor.station_id);
        }
        if self.failing.contains(&sensor.station_id) {
            return Err(AqmsError::SourceUnavailable {
                source_id: sensor.station_id.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(self
            .readings
            .get(&sensor.station_id)
            .cloned()
            .unwrap_or_else(|| RawReading::now(self.default_pm25)))
    }
}

/// Constant meteorology; forecast repeats the current conditions
#[derive(Debug, Clone)]
pub struct StaticMeteorology {
    meteorology: Meteorology,
}

impl StaticMeteorology {
    pub fn new(meteorology: Meteorology) -> Self {
        Self { meteorology }
    }
}

#[async_trait]
impl MeteorologyFeed for StaticMeteorology {
    async fn current(&self) -> Result<Meteorology> {
        Ok(self.meteorology)
    }

    async fn forecast(&self, hours: u32) -> Result<Vec<ForecastPoint>> {
        Ok((1..=hours)
            .map(|forecast_hour| ForecastPoint {
                forecast_hour,
                meteorology: self.meteorology,
            })
            .collect())
    }
}

/// A feed that is always down
#[derive(Debug, Clone, Default)]
pub struct UnavailableFeed;

impl UnavailableFeed {
    fn error(feed: &str) -> AqmsError {
        AqmsError::ModelInputMissing(format!("{} feed unavailable", feed))
    }
}

#[async_trait]
impl MeteorologyFeed for UnavailableFeed {
    async fn current(&self) -> Result<Meteorology> {
        Err(Self::error("meteorology"))
    }

    async fn forecast(&self, _hours: u32) -> Result<Vec<ForecastPoint>> {
        Err(Self::error("meteorology"))
    }
}

#[async_trait]
impl TrafficFeed for UnavailableFeed {
    async fn snapshot(&self) -> Result<TrafficSnapshot> {
        Err(Self::error("traffic"))
    }
}

#[async_trait]
impl SatelliteFeed for UnavailableFeed {
    async fn aerosol(&self) -> Result<AerosolObservation> {
        Err(Self::error("satellite"))
    }

    async fn atmospheric_profile(&self) -> Result<AtmosphericProfile> {
        Err(Self::error("satellite"))
    }
}
