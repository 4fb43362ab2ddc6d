//! Station data collection
//!
//! Gathers raw readings from every active monitoring site of a city
//! concurrently, plus the meteorology, traffic and satellite feeds used by
//! the transport model. Individual source failures are tolerated and reported
//! alongside the successful measurements.

mod collector;
pub mod feeds;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod network;
mod source;

pub use collector::{CollectionBatch, MeasurementCollector, SourceFailure};
pub use feeds::{
    hourly_emissions, peak_hour_factor, AerosolObservation, AtmosphericProfile, ForecastPoint,
    MeteorologyFeed, RetrievalQuality, RoadType, SatelliteFeed, SimulatedSatellite,
    SimulatedTrafficMonitor, SimulatedWeatherModel, TrafficCounter, TrafficFeed, TrafficSnapshot,
    VehicleType, INSAT_3DR, MAX_FORECAST_HOURS,
};
pub use network::{network_for, sensor_status, CategoryCount, NetworkStatus};
pub use source::{RawReading, ReadingSource, SimulatedSensorSource};
