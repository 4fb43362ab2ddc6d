//! Deterministic doubles shared by the integration tests

use async_trait::async_trait;

use aqms::collector::{ForecastPoint, MeteorologyFeed, RawReading, ReadingSource, TrafficFeed, TrafficSnapshot};
use aqms::domain::{Meteorology, SensorConfig};
use aqms::{AqmsError, Result};

/// Every sensor reports the same PM2.5
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

/// Same conditions now and for every forecast hour
pub struct StaticMeteorology(pub Meteorology);

#[async_trait]
impl MeteorologyFeed for StaticMeteorology {
    async fn current(&self) -> Result<Meteorology> {
        Ok(self.0)
    }

    async fn forecast(&self, hours: u32) -> Result<Vec<ForecastPoint>> {
        Ok((1..=hours)
            .map(|forecast_hour| ForecastPoint {
                forecast_hour,
                meteorology: self.0,
            })
            .collect())
    }
}

pub struct UnavailableFeed;

#[async_trait]
impl MeteorologyFeed for UnavailableFeed {
    async fn current(&self) -> Result<Meteorology> {
        Err(AqmsError::ModelInputMissing("meteorology feed unavailable".to_string()))
    }

    async fn forecast(&self, _hours: u32) -> Result<Vec<ForecastPoint>> {
        Err(AqmsError::ModelInputMissing("meteorology feed unavailable".to_string()))
    }
}

#[async_trait]
impl TrafficFeed for UnavailableFeed {
    async fn snapshot(&self) -> Result<TrafficSnapshot> {
        Err(AqmsError::ModelInputMissing("traffic feed unavailable".to_string()))
    }
}
