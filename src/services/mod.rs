pub mod monitoring;

pub use monitoring::{AgentStatus, MonitoringService, PipelineResult, ServiceStatus};
