//! Concurrent per-sensor collection
//!
//! One task per active sensor, each bounded by the configured source timeout.
//! Failed, timed-out and panicked tasks are reported in `failures` and never
//! abort the batch.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::source::{RawReading, ReadingSource};
use crate::config::CollectorConfig;
use crate::domain::{round1, Measurement, ProcessingLevel, SensorConfig};
use crate::error::AqmsError;

/// A source that could not contribute to the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub station_id: String,
    pub error: String,
}

/// Successes and failures of one collection round, in no particular order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionBatch {
    pub measurements: Vec<Measurement>,
    pub failures: Vec<SourceFailure>,
}

impl CollectionBatch {
    pub fn attempted(&self) -> usize {
        self.measurements.len() + self.failures.len()
    }
}

pub struct MeasurementCollector {
    source: Arc<dyn ReadingSource>,
    config: CollectorConfig,
}

impl MeasurementCollector {
    pub fn new(source: Arc<dyn ReadingSource>, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect from every active sensor concurrently
    pub async fn collect(&self, sensors: &[SensorConfig]) -> CollectionBatch {
        let timeout_ms = self.config.source_timeout_ms;
        let calibration = self.config.low_cost_calibration;

        let handles: Vec<_> = sensors
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .map(|sensor| {
                let source = Arc::clone(&self.source);
                let station_id = sensor.station_id.clone();
                let handle = tokio::spawn(async move {
                    let fetched =
                        tokio::time::timeout(Duration::from_millis(timeout_ms), source.fetch(&sensor))
                            .await;
                    match fetched {
                        Ok(Ok(raw)) => Ok(to_measurement(&sensor, raw, calibration)),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(AqmsError::SourceTimeout {
                            source_id: sensor.station_id.clone(),
                            timeout_ms,
                        }),
                    }
                });
                (station_id, handle)
            })
            .collect();

        let (station_ids, tasks): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(tasks).await;

        let mut batch = CollectionBatch::default();
        for (station_id, result) in station_ids.into_iter().zip(results) {
            match result {
                Ok(Ok(measurement)) => batch.measurements.push(measurement),
                Ok(Err(e)) => {
                    warn!(station = %station_id, error = %e, "Source failed, excluded from batch");
                    batch.failures.push(SourceFailure {
                        station_id,
                        error: e.to_string(),
                    });
                }
                Err(join_err) => {
                    warn!(station = %station_id, error = %join_err, "Collection task panicked");
                    batch.failures.push(SourceFailure {
                        station_id,
                        error: format!("task failed: {}", join_err),
                    });
                }
            }
        }

        info!(
            attempted = batch.attempted(),
            succeeded = batch.measurements.len(),
            failed = batch.failures.len(),
            "Collection round complete"
        );

        batch
    }
}

fn to_measurement(sensor: &SensorConfig, raw: RawReading, low_cost_calibration: f64) -> Measurement {
    // Optical sensors over-read both size fractions by the same factor
    let (factor, processing_level, calibration_factor) = if sensor.instrument.is_optical() {
        let factor = sensor.calibration_factor * low_cost_calibration;
        (factor, ProcessingLevel::Calibrated, Some(factor))
    } else {
        (1.0, ProcessingLevel::Validated, None)
    };
    let pm25 = round1(raw.pm25 * factor);
    let pm10 = raw
        .pm10
        .map(|v| round1(v * factor))
        .or_else(|| Some(round1(pm25 * 1.5)));

    debug!(station = %sensor.station_id, pm25, "Reading collected");

    Measurement {
        measurement_id: Uuid::new_v4().to_string(),
        station_id: sensor.station_id.clone(),
        country: sensor.country,
        timestamp: raw.timestamp,
        coordinate: sensor.coordinate,
        pm25,
        pm10,
        temperature: raw.temperature,
        humidity: raw.humidity,
        wind_speed: raw.wind_speed,
        wind_direction: raw.wind_direction,
        measurement_type: sensor.category(),
        source_agency: sensor.source_agency(),
        processing_level,
        calibration_factor,
        data_quality: None,
        quality_score: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{FailingSource, FixedReadingSource, ScriptedSource, StalledSource};
    use crate::collector::network_for;
    use crate::domain::{City, MeasurementType};

    fn fast_config() -> CollectorConfig {
        CollectorConfig {
            source_timeout_ms: 50,
            ..CollectorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_collects_every_active_sensor() {
        let mut sensors = network_for(City::Dhaka);
        sensors[3].is_active = false;
        let collector = MeasurementCollector::new(Arc::new(FixedReadingSource::new(100.0)), fast_config());

        let batch = collector.collect(&sensors).await;
        assert_eq!(batch.measurements.len(), sensors.len() - 1);
        assert!(batch.failures.is_empty());
        assert!(batch
            .measurements
            .iter()
            .all(|m| m.station_id != sensors[3].station_id));
    }

    #[tokio::test]
    async fn test_low_cost_calibration_applied_only_to_optical() {
        let sensors = network_for(City::Dhaka);
        let collector = MeasurementCollector::new(Arc::new(FixedReadingSource::new(100.0)), fast_config());
        let batch = collector.collect(&sensors).await;

        for m in &batch.measurements {
            match m.measurement_type {
                MeasurementType::LowCost => {
                    assert_eq!(m.pm25, 85.0);
                    assert_eq!(m.processing_level, ProcessingLevel::Calibrated);
                    assert_eq!(m.source_agency, "PurpleAir Community Network");
                }
                MeasurementType::Government => {
                    assert_eq!(m.pm25, 100.0);
                    assert_eq!(m.processing_level, ProcessingLevel::Validated);
                    assert_eq!(m.source_agency, "Department of Environment, Bangladesh");
                }
                other => panic!("unexpected classification {:?}", other),
            }
            assert_eq!(m.pm10, Some(m.pm25 * 1.5));
        }
    }

    #[tokio::test]
    async fn test_reported_pm10_calibrated_like_pm25() {
        let sensors = network_for(City::Dhaka);
        let optical = sensors
            .iter()
            .find(|s| s.instrument.is_optical())
            .map(|s| s.station_id.clone())
            .unwrap();
        let reference = sensors[0].station_id.clone();

        let mut reading = RawReading::now(100.0);
        reading.pm10 = Some(200.0);
        let source = ScriptedSource::new(50.0)
            .with_reading(optical.clone(), reading.clone())
            .with_reading(reference.clone(), reading);
        let collector = MeasurementCollector::new(Arc::new(source), fast_config());
        let batch = collector.collect(&sensors).await;

        let by_id = |id: &str| batch.measurements.iter().find(|m| m.station_id == id).unwrap();
        let low_cost = by_id(&optical);
        assert_eq!(low_cost.pm25, 85.0);
        assert_eq!(low_cost.pm10, Some(170.0));

        let government = by_id(&reference);
        assert_eq!(government.pm25, 100.0);
        assert_eq!(government.pm10, Some(200.0));
    }

    #[tokio::test]
    async fn test_failures_are_excluded_not_raised() {
        let sensors = network_for(City::Kolkata);
        let failing = sensors[0].station_id.clone();
        let source = ScriptedSource::new(60.0).failing_for([failing.clone()]);
        let collector = MeasurementCollector::new(Arc::new(source), fast_config());

        let batch = collector.collect(&sensors).await;
        assert_eq!(batch.measurements.len(), sensors.len() - 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].station_id, failing);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_batch() {
        let sensors = network_for(City::Kolkata);
        let collector = MeasurementCollector::new(Arc::new(FailingSource), fast_config());
        let batch = collector.collect(&sensors).await;
        assert!(batch.measurements.is_empty());
        assert_eq!(batch.failures.len(), sensors.len());
    }

    #[tokio::test]
    async fn test_stalled_source_times_out() {
        let sensors: Vec<_> = network_for(City::Dhaka).into_iter().take(3).collect();
        let collector = MeasurementCollector::new(
            Arc::new(StalledSource::new(Duration::from_secs(30))),
            fast_config(),
        );

        let started = std::time::Instant::now();
        let batch = collector.collect(&sensors).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(batch.measurements.is_empty());
        assert_eq!(batch.failures.len(), 3);
        assert!(batch.failures[0].error.contains("timed out"));
    }
}
