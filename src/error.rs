use thiserror::Error;

use crate::domain::Country;

/// Main error type for the monitoring pipeline
#[derive(Error, Debug)]
pub enum AqmsError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Collection errors (recovered by excluding the source from the batch)
    #[error("Source unavailable: {source_id} - {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("Source timed out: {source_id} after {timeout_ms}ms")]
    SourceTimeout { source_id: String, timeout_ms: u64 },

    // Validation errors (recovered by dropping the record)
    #[error("Validation failed: {0}")]
    Validation(String),

    // Degraded model input (recovered by marking the section unavailable)
    #[error("Model input missing: {0}")]
    ModelInputMissing(String),

    // Orchestration errors (surfaced as a run-level error result)
    #[error("Orchestration failed: {0}")]
    Orchestration(String),

    // Outbound delivery errors
    #[error("Alert channel {channel} failed: {reason}")]
    Channel { channel: String, reason: String },

    #[error("Link to {target} failed: {reason}")]
    Link { target: Country, reason: String },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AqmsError {
    /// Soft failures are tolerated by the collector and excluded from the batch
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            AqmsError::SourceUnavailable { .. } | AqmsError::SourceTimeout { .. }
        )
    }
}

/// Result type alias for AqmsError
pub type Result<T> = std::result::Result<T, AqmsError>;
