//! Regional orchestrator
//!
//! Sole caller of the validator, transport model and policy engine per run.
//! Drafts cross-border proposals and issues alerts from the per-city results.

pub mod coordinator;
pub mod report;
pub mod state;

pub use coordinator::RegionalOrchestrator;
pub use report::{
    CityAssessment, CityOutcome, CoordinatedAction, CoordinationOutcome, IssuedAlert,
    OrchestrationContext, OrchestrationReport, OrchestrationResult,
};
pub use state::{OrchestrationStats, OrchestratorStatus};
