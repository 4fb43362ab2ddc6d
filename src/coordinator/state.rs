//! Orchestrator run counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters owned by one orchestrator instance, updated once at the end of
/// every run whatever its outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    /// Rolling mean over all runs (seconds)
    pub average_processing_time: f64,
    pub alerts_generated: u64,
    pub policies_coordinated: u64,
}

impl OrchestrationStats {
    pub fn record(
        &mut self,
        processing_time_secs: f64,
        succeeded: bool,
        alerts_generated: usize,
        policies_coordinated: usize,
    ) {
        self.total_runs += 1;
        if succeeded {
            self.successful_runs += 1;
        }
        self.last_run = Some(Utc::now());
        self.alerts_generated += alerts_generated as u64;
        self.policies_coordinated += policies_coordinated as u64;

        let n = self.total_runs as f64;
        self.average_processing_time =
            (self.average_processing_time * (n - 1.0) + processing_time_secs) / n;
    }
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub orchestrator_name: String,
    pub status: String,
    pub orchestration_stats: OrchestrationStats,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average_covers_failed_runs() {
        let mut stats = OrchestrationStats::default();
        stats.record(1.0, true, 2, 1);
        stats.record(3.0, false, 0, 0);

        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.successful_runs, 1);
        assert_eq!(stats.alerts_generated, 2);
        assert_eq!(stats.policies_coordinated, 1);
        assert!((stats.average_processing_time - 2.0).abs() < 1e-12);
        assert!(stats.last_run.is_some());
    }
}
