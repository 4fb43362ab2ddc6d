//! Quality control for station measurements
//!
//! Every rule runs independently and accumulates into one `ValidationResult`.
//! Only a negative PM2.5 or an unparsable timestamp makes a record invalid;
//! everything else is a warning that lowers `quality_score`. The timestamp
//! window applies in both directions, so clock-skewed future readings warn
//! like stale ones.
//!
//! Values are never clamped here: a flagged PM2.5 above the configured
//! maximum reaches the transport model and policy engine unchanged.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ValidatorConfig;
use crate::domain::{DataQuality, Measurement};

/// Quality penalty for a PM2.5 above the configured maximum
pub const PM25_HIGH_PENALTY: f64 = 0.8;
/// Quality penalty for a temperature outside the plausible band
pub const TEMPERATURE_PENALTY: f64 = 0.9;
/// Quality penalty for a reading older than the temporal window
pub const STALE_PENALTY: f64 = 0.95;

/// Outcome of validating one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// In (0, 1]; each warning multiplies it by a penalty below 1
    pub quality_score: f64,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
            quality_score: 1.0,
        }
    }

    fn warn(&mut self, message: String, penalty: f64) {
        self.warnings.push(message);
        self.quality_score *= penalty;
    }

    fn reject(&mut self, message: String) {
        self.errors.push(message);
        self.is_valid = false;
    }

    pub fn data_quality(&self) -> DataQuality {
        if !self.is_valid {
            DataQuality::Invalid
        } else if self.warnings.is_empty() {
            DataQuality::Valid
        } else {
            DataQuality::Questionable
        }
    }
}

/// Aggregate statistics over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchValidationSummary {
    pub total_measurements: usize,
    pub valid_measurements: usize,
    pub measurements_with_warnings: usize,
    pub measurements_with_errors: usize,
    /// valid / total, 0 for an empty batch
    pub validation_rate: f64,
    pub average_quality_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// A dropped measurement and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub station_id: String,
    pub errors: Vec<String>,
}

/// Batch split into usable and dropped records
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub accepted: Vec<Measurement>,
    pub rejected: Vec<Rejection>,
    pub summary: BatchValidationSummary,
}

/// Rule-based measurement validator
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    rules: ValidatorConfig,
}

impl DataValidator {
    pub fn new(rules: ValidatorConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidatorConfig {
        &self.rules
    }

    /// Validate a single measurement against the current clock
    pub fn validate(&self, measurement: &Measurement) -> ValidationResult {
        self.validate_at(measurement, Utc::now())
    }

    /// Validate a single measurement as of `now`
    pub fn validate_at(&self, measurement: &Measurement, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let pm25 = measurement.pm25;

        if pm25 > self.rules.pm25_max {
            result.warn(
                format!(
                    "PM2.5 value {} exceeds maximum threshold {}",
                    pm25, self.rules.pm25_max
                ),
                PM25_HIGH_PENALTY,
            );
        }

        // NaN fails both comparisons above, so reject it explicitly
        if pm25 < self.rules.pm25_min || pm25.is_nan() {
            result.reject(format!(
                "PM2.5 value {} below minimum threshold {}",
                pm25, self.rules.pm25_min
            ));
        }

        if let Some(temp) = measurement.temperature {
            if !temp.is_finite()
                || temp > self.rules.temperature_max
                || temp < self.rules.temperature_min
            {
                result.warn(
                    format!(
                        "Temperature {}°C outside expected range [{}, {}]",
                        temp, self.rules.temperature_min, self.rules.temperature_max
                    ),
                    TEMPERATURE_PENALTY,
                );
            }
        }

        match measurement.parsed_timestamp() {
            Some(ts) => {
                let age_secs = (now - ts).num_seconds();
                if age_secs.abs() > self.rules.temporal_window_secs {
                    let message = if age_secs < 0 {
                        format!("Measurement timestamp {}s in the future", -age_secs)
                    } else {
                        format!("Measurement timestamp {}s old", age_secs)
                    };
                    result.warn(message, STALE_PENALTY);
                }
            }
            None => result.reject(format!(
                "Invalid timestamp format: {:?}",
                measurement.timestamp
            )),
        }

        debug!(
            station = %measurement.station_id,
            valid = result.is_valid,
            quality = result.quality_score,
            "Validated measurement"
        );

        result
    }

    /// Validate a batch and summarise it
    pub fn validate_batch(&self, measurements: &[Measurement]) -> BatchValidationSummary {
        let now = Utc::now();
        let results: Vec<ValidationResult> = measurements
            .iter()
            .map(|m| self.validate_at(m, now))
            .collect();
        summarize(&results, now)
    }

    /// Validate, annotate the usable records and drop the rest
    pub fn partition(&self, measurements: Vec<Measurement>) -> ValidatedBatch {
        let now = Utc::now();
        let mut results = Vec::with_capacity(measurements.len());
        let mut accepted = Vec::with_capacity(measurements.len());
        let mut rejected = Vec::new();

        for mut measurement in measurements {
            let result = self.validate_at(&measurement, now);
            if result.is_valid {
                measurement.data_quality = Some(result.data_quality());
                measurement.quality_score = Some(result.quality_score);
                accepted.push(measurement);
            } else {
                warn!(
                    "Rejected measurement from {}: {}",
                    measurement.station_id,
                    result.errors.join("; ")
                );
                rejected.push(Rejection {
                    station_id: measurement.station_id.clone(),
                    errors: result.errors.clone(),
                });
            }
            results.push(result);
        }

        ValidatedBatch {
            accepted,
            rejected,
            summary: summarize(&results, now),
        }
    }
}

fn summarize(results: &[ValidationResult], now: DateTime<Utc>) -> BatchValidationSummary {
    let total = results.len();
    let valid = results.iter().filter(|r| r.is_valid).count();
    let with_warnings = results.iter().filter(|r| !r.warnings.is_empty()).count();
    let with_errors = results.iter().filter(|r| !r.errors.is_empty()).count();
    let average_quality = if total > 0 {
        results.iter().map(|r| r.quality_score).sum::<f64>() / total as f64
    } else {
        0.0
    };

    BatchValidationSummary {
        total_measurements: total,
        valid_measurements: valid,
        measurements_with_warnings: with_warnings,
        measurements_with_errors: with_errors,
        validation_rate: if total > 0 {
            valid as f64 / total as f64
        } else {
            0.0
        },
        average_quality_score: average_quality,
        timestamp: now,
    }
}
