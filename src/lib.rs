pub mod agents;
pub mod cli;
pub mod collector;
pub mod config;
pub mod coordination;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod policy;
pub mod services;
pub mod transport;
pub mod validation;

pub use agents::{CityAgent, CollectionResult, CollectionStats, Section};
pub use collector::{
    CollectionBatch, MeasurementCollector, MeteorologyFeed, ReadingSource, SimulatedSensorSource,
    TrafficFeed,
};
pub use config::AppConfig;
pub use coordination::{
    A2aMessage, AlertChannel, AlertDispatcher, Channel, CountryLink, ProposalBook,
};
pub use coordinator::{
    OrchestrationContext, OrchestrationResult, OrchestrationStats, RegionalOrchestrator,
};
pub use domain::{City, CityObservation, Country, Measurement, Meteorology};
pub use error::{AqmsError, Result};
pub use policy::PolicyEngine;
pub use services::MonitoringService;
pub use transport::{apportion, TransportModel};
pub use validation::{DataValidator, ValidationResult};
