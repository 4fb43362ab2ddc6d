//! Emission apportionment and transboundary transport
//!
//! Pure functions of their inputs; no I/O and no shared state.

pub mod dispersion;
pub mod emission;
pub mod model;

pub use dispersion::{
    aerosol_conditions, analyze_forecast_trend, dispersion_parameters, estimate_local_emissions,
    transport_potential, AerosolConditions, AtmosphericLoading, DispersionParameters,
    ForecastTrend, LocalEmissionEstimate, StabilityClass, TransportPotential,
    TransportPotentialAnalysis,
};
pub use emission::{apportion, source_table, wind_transboundary_factor, Apportionment, EmissionSource};
pub use model::{
    transport_efficiency, transport_time_hours, Coefficients, TransportEstimate, TransportModel,
    MIN_TRANSPORT_WIND_MS,
};
