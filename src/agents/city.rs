//! Per-city monitoring agent
//!
//! One round: collect → validate → enrich with meteorology, traffic and
//! satellite data → share the city aggregate with the neighbouring agent.
//! Feed failures degrade individual report sections; a panic anywhere in the
//! round is caught and reported as an `error` result. Aggregates arriving
//! from the neighbour are validated before the agent keeps them.

use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::report::{
    CollectionReport, CollectionResult, CollectionStats, ForecastSummary, NeighborExchange,
    SatelliteData, Section,
};
use crate::collector::{
    network_for, sensor_status, MeasurementCollector, MeteorologyFeed, NetworkStatus, ReadingSource,
    SatelliteFeed, SimulatedSatellite, SimulatedSensorSource, SimulatedTrafficMonitor,
    SimulatedWeatherModel, TrafficFeed,
};
use crate::config::AppConfig;
use crate::coordination::{accept_incoming, A2aMessage, CityAggregate, CountryLink, MessageType};
use crate::domain::{city_centre, round1, City, CityObservation, Measurement, Meteorology, SensorConfig};
use crate::error::{AqmsError, Result};
use crate::transport::{
    aerosol_conditions, analyze_forecast_trend, dispersion_parameters, estimate_local_emissions,
    transport_potential, TransportModel,
};
use crate::validation::DataValidator;

/// Hours of forecast requested every round
const FORECAST_HOURS: u32 = 24;

pub struct CityAgent {
    city: City,
    sensors: Vec<SensorConfig>,
    collector: MeasurementCollector,
    validator: DataValidator,
    meteorology: Arc<dyn MeteorologyFeed>,
    traffic: Arc<dyn TrafficFeed>,
    satellite: Option<Arc<dyn SatelliteFeed>>,
    link: Arc<dyn CountryLink>,
    transport: TransportModel,
    feed_timeout: Duration,
    stats: CollectionStats,
    neighbor: Option<CityAggregate>,
}

impl CityAgent {
    pub fn new(
        city: City,
        source: Arc<dyn ReadingSource>,
        meteorology: Arc<dyn MeteorologyFeed>,
        traffic: Arc<dyn TrafficFeed>,
        link: Arc<dyn CountryLink>,
        config: &AppConfig,
    ) -> Self {
        Self {
            city,
            sensors: network_for(city),
            collector: MeasurementCollector::new(source, config.collector.clone()),
            validator: DataValidator::new(config.validator.clone()),
            meteorology,
            traffic,
            satellite: None,
            link,
            transport: TransportModel::new(),
            feed_timeout: Duration::from_millis(config.collector.source_timeout_ms),
            stats: CollectionStats::default(),
            neighbor: None,
        }
    }

    /// Agent wired to the built-in simulated sources and feeds. Both agents
    /// of a deployment share `link` so each can receive the other's data.
    pub fn simulated(city: City, link: Arc<dyn CountryLink>, config: &AppConfig) -> Self {
        let delay = Duration::from_millis(config.collector.simulated_delay_ms);
        Self::new(
            city,
            Arc::new(SimulatedSensorSource::new(
                delay,
                config.collector.simulated_failure_rate,
            )),
            Arc::new(SimulatedWeatherModel::new(city, delay)),
            Arc::new(SimulatedTrafficMonitor::new(city, delay)),
            link,
            config,
        )
        .with_satellite(Arc::new(SimulatedSatellite::new(city, delay)))
    }

    pub fn with_satellite(mut self, satellite: Arc<dyn SatelliteFeed>) -> Self {
        self.satellite = Some(satellite);
        self
    }

    /// Replace the default network for this city
    pub fn with_sensors(mut self, sensors: Vec<SensorConfig>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn city(&self) -> City {
        self.city
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn sensor_status(&self) -> NetworkStatus {
        sensor_status(&self.sensors)
    }

    /// Last neighbour aggregate that passed validation
    pub fn neighbor_data(&self) -> Option<&CityAggregate> {
        self.neighbor.as_ref()
    }

    /// Drain the link for this agent's country and keep the newest valid
    /// neighbour aggregate. Invalid payloads are dropped.
    pub async fn receive_neighbor_data(&mut self) -> NeighborExchange {
        let city = self.city;
        let country = city.country();
        let messages = match self.link.receive(country).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(city = %city, error = %e, "Failed to read neighbour messages");
                Vec::new()
            }
        };

        let mut exchange = NeighborExchange {
            received: messages.len(),
            ..NeighborExchange::default()
        };
        for message in &messages {
            if message.message_type != MessageType::AirQualityData {
                debug!(city = %city, message_id = %message.message_id, "Ignoring non-data message");
                continue;
            }
            match accept_incoming(message, country) {
                Ok(aggregate) => {
                    exchange.accepted += 1;
                    self.neighbor = Some(aggregate);
                }
                Err(e) => {
                    warn!(
                        city = %city,
                        message_id = %message.message_id,
                        error = %e,
                        "Dropped neighbour payload"
                    );
                    exchange.rejected.push(e.to_string());
                }
            }
        }

        if exchange.received > 0 {
            info!(
                city = %city,
                accepted = exchange.accepted,
                rejected = exchange.rejected.len(),
                "Neighbour data received"
            );
        }
        exchange.latest = self.neighbor.clone();
        exchange
    }

    /// Run one collection round. Always returns a result record.
    pub async fn run_collection(&mut self) -> CollectionResult {
        let city = self.city;
        info!(city = %city, sensors = self.sensors.len(), "Starting collection round");

        let result = match AssertUnwindSafe(self.collect_round()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(city = %city, error = %reason, "Collection round panicked");
                CollectionResult::Error {
                    city,
                    error: reason,
                    timestamp: Utc::now(),
                }
            }
        };

        self.stats.record(&result);
        info!(city = %city, status = result.status(), "Collection round finished");
        result
    }

    async fn collect_round(&self) -> CollectionResult {
        let started = Instant::now();
        let city = self.city;
        let country = city.country();

        let batch = self.collector.collect(&self.sensors).await;
        let raw_measurements = batch.measurements.len();
        if raw_measurements == 0 {
            warn!(city = %city, failed = batch.failures.len(), "No measurements collected");
            return CollectionResult::NoData {
                city,
                reason: "no source returned a measurement".to_string(),
                failed_sources: batch.failures,
                timestamp: Utc::now(),
            };
        }

        let validated = self.validator.partition(batch.measurements);
        if validated.accepted.is_empty() {
            warn!(city = %city, rejected = validated.rejected.len(), "Every measurement failed validation");
            return CollectionResult::ValidationFailed {
                city,
                validation: validated.summary,
                rejected: validated.rejected,
                timestamp: Utc::now(),
            };
        }

        let (current, forecast, traffic, satellite_data) = tokio::join!(
            self.bounded("meteorology", self.meteorology.current()),
            self.bounded("forecast", self.meteorology.forecast(FORECAST_HOURS)),
            self.bounded("traffic", self.traffic.snapshot()),
            self.satellite_round(),
        );

        let meteorology = Section::from_result(current);
        let forecast = Section::from_result(forecast).map(|points| ForecastSummary {
            hours_available: points.len(),
            trend: analyze_forecast_trend(points),
            points: points.clone(),
        });
        let traffic = Section::from_result(traffic);

        let dispersion = meteorology.map(dispersion_parameters);
        let transport = meteorology.map(|met| self.transport.model_transport(met, country));
        let transport_potential = meteorology.map(transport_potential);
        let local_emissions = match traffic.data() {
            Some(snapshot) => Section::Available {
                data: estimate_local_emissions(snapshot, meteorology.data()),
            },
            None => Section::unavailable("traffic snapshot unavailable"),
        };

        let aggregate = aggregate(city, &validated.accepted);
        let observation = observation_from(&aggregate, &validated.accepted, meteorology.data());
        let shared_with_neighbor = match self.share(&aggregate).await {
            Ok(()) => true,
            Err(e) => {
                warn!(city = %city, error = %e, "Failed to share aggregate with neighbour");
                false
            }
        };

        debug!(
            city = %city,
            pm25 = aggregate.pm25,
            valid = validated.accepted.len(),
            meteorology = meteorology.is_available(),
            traffic = traffic.is_available(),
            satellite = satellite_data.is_available(),
            "Collection round assembled"
        );

        CollectionResult::Success(Box::new(CollectionReport {
            city,
            timestamp: Utc::now(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            raw_measurements,
            failed_sources: batch.failures,
            validation: validated.summary,
            rejected: validated.rejected,
            measurements: validated.accepted,
            aggregate,
            observation,
            shared_with_neighbor,
            sensor_status: self.sensor_status(),
            meteorology,
            dispersion,
            forecast,
            traffic,
            local_emissions,
            transport,
            transport_potential,
            satellite_data,
        }))
    }

    /// Aerosol retrieval plus sounding; a missing sounding only degrades the profile
    async fn satellite_round(&self) -> Section<SatelliteData> {
        let Some(satellite) = &self.satellite else {
            return Section::unavailable("no satellite feed configured");
        };
        let (aerosol, profile) = tokio::join!(
            self.bounded("satellite aerosol", satellite.aerosol()),
            self.bounded("satellite profile", satellite.atmospheric_profile()),
        );
        Section::from_result(aerosol).map(|aerosol| SatelliteData {
            aerosol: aerosol.clone(),
            aerosol_conditions: aerosol_conditions(aerosol),
            atmospheric_profile: Section::from_result(profile),
        })
    }

    /// Feed call bounded by the source timeout; a timeout counts as missing input
    async fn bounded<T>(&self, feed: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.feed_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AqmsError::ModelInputMissing(format!(
                "{} feed timed out after {}ms",
                feed,
                self.feed_timeout.as_millis()
            ))),
        }
    }

    async fn share(&self, aggregate: &CityAggregate) -> Result<()> {
        let payload = serde_json::to_value(aggregate)?;
        let message = A2aMessage::to_neighbor(aggregate.country, MessageType::AirQualityData, payload);
        self.link.send(message).await
    }
}

/// Mean, max and min PM2.5 over the accepted measurements
fn aggregate(city: City, measurements: &[Measurement]) -> CityAggregate {
    let count = measurements.len();
    let values = measurements.iter().map(|m| m.pm25);
    let sum: f64 = values.clone().sum();
    let max = values.clone().fold(f64::MIN, f64::max);
    let min = values.fold(f64::MAX, f64::min);

    CityAggregate {
        city,
        country: city.country(),
        pm25: round1(sum / count.max(1) as f64),
        pm25_max: max,
        pm25_min: min,
        measurement_count: count,
        timestamp: Utc::now().to_rfc3339(),
        coordinates: city_centre(city.country()),
    }
}

fn observation_from(
    aggregate: &CityAggregate,
    measurements: &[Measurement],
    meteorology: Option<&Meteorology>,
) -> CityObservation {
    let temperatures: Vec<f64> = measurements.iter().filter_map(|m| m.temperature).collect();
    let mut observation = CityObservation::new(aggregate.pm25, aggregate.timestamp.clone())
        .with_country(aggregate.country);
    if !temperatures.is_empty() {
        observation.temperature = Some(round1(
            temperatures.iter().sum::<f64>() / temperatures.len() as f64,
        ));
    }
    if let Some(met) = meteorology {
        observation = observation.with_meteorology(*met);
    }
    observation
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown cause".to_string()
    }
}
