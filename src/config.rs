use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Upper bound on a single source fetch (milliseconds)
    pub source_timeout_ms: u64,
    /// Simulated network delay for the built-in sources (milliseconds)
    pub simulated_delay_ms: u64,
    /// Probability that a simulated source fails a fetch (0.0 - 1.0)
    pub simulated_failure_rate: f64,
    /// Multiplicative correction for optical low-cost sensors
    pub low_cost_calibration: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source_timeout_ms: 2_000,
            simulated_delay_ms: 100,
            simulated_failure_rate: 0.0,
            low_cost_calibration: 0.85,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// PM2.5 above this is flagged (µg/m³)
    pub pm25_max: f64,
    /// PM2.5 below this is rejected (µg/m³)
    pub pm25_min: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    /// Measurements older than this are flagged as stale (seconds)
    pub temporal_window_secs: i64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            pm25_max: 900.0,
            pm25_min: 0.0,
            temperature_min: 5.0,
            temperature_max: 50.0,
            temporal_window_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Transboundary fraction that raises the cross-border alert for Bangladesh
    pub bangladesh_alarm_fraction: f64,
    /// Transboundary fraction that raises the cross-border alert for India
    pub india_alarm_fraction: f64,
    /// Transboundary share (percent) above which coordination is requested
    pub coordination_threshold_percent: f64,
    /// Bounded delay used by the simulated channels and links (milliseconds)
    pub simulated_delivery_ms: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            bangladesh_alarm_fraction: 0.5,
            india_alarm_fraction: 0.4,
            coordination_threshold_percent: 30.0,
            simulated_delivery_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AQMS_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (AQMS__COLLECTOR__SOURCE_TIMEOUT_MS, etc.)
            .add_source(
                Environment::with_prefix("AQMS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.collector.source_timeout_ms == 0 {
            errors.push("collector.source_timeout_ms must be positive".to_string());
        }

        if !(0.0..=1.0).contains(&self.collector.simulated_failure_rate) {
            errors.push("collector.simulated_failure_rate must be between 0 and 1".to_string());
        }

        if self.collector.low_cost_calibration <= 0.0 {
            errors.push("collector.low_cost_calibration must be positive".to_string());
        }

        if self.validator.pm25_min >= self.validator.pm25_max {
            errors.push("validator.pm25_min must be below validator.pm25_max".to_string());
        }

        if self.validator.temperature_min >= self.validator.temperature_max {
            errors.push(
                "validator.temperature_min must be below validator.temperature_max".to_string(),
            );
        }

        if self.validator.temporal_window_secs <= 0 {
            errors.push("validator.temporal_window_secs must be positive".to_string());
        }

        for (name, value) in [
            ("bangladesh_alarm_fraction", self.alerting.bangladesh_alarm_fraction),
            ("india_alarm_fraction", self.alerting.india_alarm_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("alerting.{} must be between 0 and 1", name));
            }
        }

        if !(0.0..=100.0).contains(&self.alerting.coordination_threshold_percent) {
            errors.push("alerting.coordination_threshold_percent must be 0-100".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.validator.pm25_max, 900.0);
        assert_eq!(config.validator.temporal_window_secs, 3_600);
        assert_eq!(config.alerting.bangladesh_alarm_fraction, 0.5);
        assert_eq!(config.alerting.india_alarm_fraction, 0.4);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = AppConfig::default();
        config.validator.pm25_min = 1000.0;
        config.collector.simulated_failure_rate = 1.5;
        config.alerting.india_alarm_fraction = -0.1;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/aqms-config").unwrap();
        assert_eq!(config.collector.source_timeout_ms, 2_000);
        assert_eq!(config.logging.level, "info");
    }
}
