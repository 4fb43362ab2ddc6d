//! City agents
//!
//! Each agent owns its sensor network, feeds and link to the neighbouring
//! country, and runs one collection round per call.

pub mod city;
pub mod report;

pub use city::CityAgent;
pub use report::{
    CollectionReport, CollectionResult, CollectionStats, ForecastSummary, NeighborExchange,
    SatelliteData, Section,
};
