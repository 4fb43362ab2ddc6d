//! Meteorology, traffic and satellite feeds
//!
//! All three feeds are optional inputs. Callers degrade the affected report
//! section to `unavailable` when a feed errors instead of failing the run.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::{round1, City, Coordinate, Meteorology};
use crate::error::Result;

/// Longest horizon served by the weather model
pub const MAX_FORECAST_HOURS: u32 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub forecast_hour: u32,
    #[serde(flatten)]
    pub meteorology: Meteorology,
}

#[async_trait]
pub trait MeteorologyFeed: Send + Sync {
    async fn current(&self) -> Result<Meteorology>;

    /// Hourly points starting one hour ahead, capped at the model horizon
    async fn forecast(&self, hours: u32) -> Result<Vec<ForecastPoint>>;
}

#[async_trait]
pub trait TrafficFeed: Send + Sync {
    async fn snapshot(&self) -> Result<TrafficSnapshot>;
}

/// Geostationary aerosol and sounding products over the city
#[async_trait]
pub trait SatelliteFeed: Send + Sync {
    async fn aerosol(&self) -> Result<AerosolObservation>;

    async fn atmospheric_profile(&self) -> Result<AtmosphericProfile>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalQuality {
    Good,
    Moderate,
}

/// Column aerosol retrieval for one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AerosolObservation {
    pub timestamp: DateTime<Utc>,
    pub satellite: String,
    pub spatial_resolution_km: f64,
    pub aerosol_optical_depth_550nm: f64,
    pub aerosol_optical_depth_865nm: f64,
    pub angstrom_exponent: f64,
    pub water_vapor_cm: f64,
    pub cloud_fraction: f64,
    pub surface_reflectance: f64,
    pub data_quality: RetrievalQuality,
    pub cloud_contamination: bool,
    pub sun_glint: bool,
}

/// Vertical temperature and humidity sounding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericProfile {
    pub timestamp: DateTime<Utc>,
    pub satellite: String,
    pub pressure_levels_hpa: Vec<f64>,
    pub temperature_profile_c: Vec<f64>,
    pub humidity_profile_percent: Vec<f64>,
    pub tropopause_height_km: f64,
    pub precipitable_water_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Cars,
    Buses,
    Trucks,
    Motorcycles,
    AutoRickshaws,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::Cars,
        VehicleType::Buses,
        VehicleType::Trucks,
        VehicleType::Motorcycles,
        VehicleType::AutoRickshaws,
    ];

    /// kg PM2.5 per vehicle-km
    pub fn emission_factor(&self) -> f64 {
        match self {
            VehicleType::Cars => 0.12,
            VehicleType::Buses => 0.85,
            VehicleType::Trucks => 1.2,
            VehicleType::Motorcycles => 0.08,
            VehicleType::AutoRickshaws => 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Highway,
    Arterial,
    Local,
}

impl RoadType {
    /// Vehicles per hour outside peak time
    pub fn base_count(&self, vehicle: VehicleType) -> u32 {
        use VehicleType::*;
        match (self, vehicle) {
            (RoadType::Highway, Cars) => 800,
            (RoadType::Highway, Buses) => 50,
            (RoadType::Highway, Trucks) => 100,
            (RoadType::Highway, Motorcycles) => 400,
            (RoadType::Highway, AutoRickshaws) => 0,
            (RoadType::Arterial, Cars) => 400,
            (RoadType::Arterial, Buses) => 30,
            (RoadType::Arterial, Trucks) => 20,
            (RoadType::Arterial, Motorcycles) => 300,
            (RoadType::Arterial, AutoRickshaws) => 150,
            (RoadType::Local, Cars) => 150,
            (RoadType::Local, Buses) => 5,
            (RoadType::Local, Trucks) => 5,
            (RoadType::Local, Motorcycles) => 200,
            (RoadType::Local, AutoRickshaws) => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficCounter {
    pub counter_id: String,
    pub location_name: String,
    pub coordinate: Coordinate,
    pub road_type: RoadType,
    pub vehicle_types: Vec<VehicleType>,
    pub is_active: bool,
}

impl TrafficCounter {
    fn new(
        counter_id: impl Into<String>,
        location_name: impl Into<String>,
        coordinate: Coordinate,
        road_type: RoadType,
        vehicle_types: &[VehicleType],
    ) -> Self {
        Self {
            counter_id: counter_id.into(),
            location_name: location_name.into(),
            coordinate,
            road_type,
            vehicle_types: vehicle_types.to_vec(),
            is_active: true,
        }
    }
}

/// City-wide traffic aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub timestamp: DateTime<Utc>,
    pub active_counters: usize,
    pub total_counters: usize,
    pub vehicle_counts: BTreeMap<VehicleType, u64>,
    pub total_estimated_emissions_kg_hour: f64,
    pub average_traffic_density: f64,
    pub peak_hour_factor: f64,
}

/// Time-of-day traffic multiplier, `hour` in local time
pub fn peak_hour_factor(hour: u32) -> f64 {
    match hour {
        7..=9 | 17..=19 => 1.5,
        10..=16 => 1.2,
        20..=22 => 1.1,
        _ => 0.7,
    }
}

/// Hourly emissions of `count` vehicles of one type (kg/h)
pub fn hourly_emissions(vehicle: VehicleType, count: u64) -> f64 {
    count as f64 * vehicle.emission_factor() * 0.1
}

fn utc_offset(city: City) -> FixedOffset {
    let secs = match city {
        City::Dhaka => 6 * 3600,
        City::Kolkata => 5 * 3600 + 1800,
    };
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

fn local_now(city: City) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&utc_offset(city))
}

/// Stand-in for the regional numerical weather model
#[derive(Debug, Clone)]
pub struct SimulatedWeatherModel {
    city: City,
    delay: Duration,
}

impl SimulatedWeatherModel {
    pub fn new(city: City, delay: Duration) -> Self {
        Self { city, delay }
    }

    fn base_temperature(&self) -> f64 {
        match self.city {
            City::Dhaka => 26.0,
            City::Kolkata => 28.0,
        }
    }

    fn sample_current(&self) -> Meteorology {
        let mut rng = rand::thread_rng();
        let day = f64::from(local_now(self.city).ordinal());
        let season = (day / 365.0 * 2.0 * std::f64::consts::PI).sin();

        Meteorology {
            wind_speed_ms: round1(rng.gen_range(2.0..12.0)),
            wind_direction_deg: rng.gen_range(0.0_f64..360.0).round(),
            boundary_layer_height_m: rng.gen_range(800.0_f64..2000.0).round(),
            temperature_c: Some(round1(
                self.base_temperature() + season * 8.0 + rng.gen_range(-3.0..3.0),
            )),
            humidity_pct: Some(round1(rng.gen_range(65.0..85.0))),
            surface_pressure_hpa: Some(round1(rng.gen_range(1008.0..1018.0))),
        }
    }

    fn sample_forecast(&self, base: Meteorology, hours: u32) -> Vec<ForecastPoint> {
        let mut rng = rand::thread_rng();
        (1..=hours.min(MAX_FORECAST_HOURS))
            .map(|hour| {
                let h = f64::from(hour);
                let temp_trend = rng.gen_range(-0.5..0.5) * h;
                let wind_trend = rng.gen_range(-0.2..0.2) * h;
                let blh_trend = rng.gen_range(-40.0..40.0) * h;
                ForecastPoint {
                    forecast_hour: hour,
                    meteorology: Meteorology {
                        wind_speed_ms: round1((base.wind_speed_ms + wind_trend).max(0.0)),
                        boundary_layer_height_m: (base.boundary_layer_height_m + blh_trend)
                            .max(100.0)
                            .round(),
                        temperature_c: base.temperature_c.map(|t| round1(t + temp_trend)),
                        ..base
                    },
                }
            })
            .collect()
    }
}

#[async_trait]
impl MeteorologyFeed for SimulatedWeatherModel {
    async fn current(&self) -> Result<Meteorology> {
        tokio::time::sleep(self.delay).await;
        Ok(self.sample_current())
    }

    async fn forecast(&self, hours: u32) -> Result<Vec<ForecastPoint>> {
        tokio::time::sleep(self.delay).await;
        let base = self.sample_current();
        Ok(self.sample_forecast(base, hours))
    }
}

/// Stand-in for the city's automatic traffic counter network
#[derive(Debug, Clone)]
pub struct SimulatedTrafficMonitor {
    city: City,
    counters: Vec<TrafficCounter>,
    delay: Duration,
}

const GENERATED_COUNTERS: u32 = 20;

impl SimulatedTrafficMonitor {
    pub fn new(city: City, delay: Duration) -> Self {
        Self {
            city,
            counters: counter_network(city),
            delay,
        }
    }

    pub fn counters(&self) -> &[TrafficCounter] {
        &self.counters
    }

    fn sample(&self) -> TrafficSnapshot {
        let now = local_now(self.city);
        let hour = now.hour();
        let counter_peak = if matches!(hour, 7..=9 | 17..=19) { 1.5 } else { 1.0 };

        let mut rng = rand::thread_rng();
        let mut vehicle_counts: BTreeMap<VehicleType, u64> =
            VehicleType::ALL.iter().map(|v| (*v, 0)).collect();
        let mut total_emissions = 0.0;
        let mut active = 0usize;

        for counter in self.counters.iter().filter(|c| c.is_active) {
            active += 1;
            for vehicle in &counter.vehicle_types {
                let base = f64::from(counter.road_type.base_count(*vehicle));
                let count = (base * counter_peak * rng.gen_range(0.7..1.3)) as u64;
                *vehicle_counts.entry(*vehicle).or_insert(0) += count;
                total_emissions += hourly_emissions(*vehicle, count);
            }
        }

        let total_vehicles: u64 = vehicle_counts.values().sum();
        let average_traffic_density = if active > 0 {
            round1(total_vehicles as f64 / active as f64)
        } else {
            0.0
        };

        TrafficSnapshot {
            timestamp: Utc::now(),
            active_counters: active,
            total_counters: self.counters.len(),
            vehicle_counts,
            total_estimated_emissions_kg_hour: (total_emissions * 100.0).round() / 100.0,
            average_traffic_density,
            peak_hour_factor: peak_hour_factor(hour),
        }
    }
}

#[async_trait]
impl TrafficFeed for SimulatedTrafficMonitor {
    async fn snapshot(&self) -> Result<TrafficSnapshot> {
        tokio::time::sleep(self.delay).await;
        Ok(self.sample())
    }
}

pub const INSAT_3DR: &str = "INSAT-3DR";

/// Sounding levels reported by the simulated profiler (hPa)
const PRESSURE_LEVELS_HPA: [f64; 8] = [1000.0, 925.0, 850.0, 700.0, 500.0, 300.0, 200.0, 100.0];
/// Standard lapse rate per sounding level (°C)
const LAPSE_PER_LEVEL_C: f64 = 6.5;

/// Stand-in for the INSAT-3DR aerosol and sounding products
#[derive(Debug, Clone)]
pub struct SimulatedSatellite {
    city: City,
    delay: Duration,
}

impl SimulatedSatellite {
    pub fn new(city: City, delay: Duration) -> Self {
        Self { city, delay }
    }

    /// Typical annual-mean AOD at 550 nm
    fn base_aod(&self) -> f64 {
        match self.city {
            City::Dhaka => 0.7,
            City::Kolkata => 0.6,
        }
    }

    fn sample_aerosol(&self) -> AerosolObservation {
        let mut rng = rand::thread_rng();
        let day = f64::from(local_now(self.city).ordinal());
        let seasonal = (day / 365.0 * 2.0 * std::f64::consts::PI).sin() * 0.3;
        let round3 = |v: f64| (v * 1000.0).round() / 1000.0;

        AerosolObservation {
            timestamp: Utc::now(),
            satellite: INSAT_3DR.to_string(),
            spatial_resolution_km: 4.0,
            aerosol_optical_depth_550nm: round3(self.base_aod() + seasonal + rng.gen_range(-0.2..0.3)),
            aerosol_optical_depth_865nm: round3(
                (self.base_aod() + seasonal) * 0.7 + rng.gen_range(-0.1..0.2),
            ),
            angstrom_exponent: (rng.gen_range(0.8_f64..1.6) * 100.0).round() / 100.0,
            water_vapor_cm: round1(rng.gen_range(2.5..4.5)),
            cloud_fraction: (rng.gen_range(0.2_f64..0.8) * 100.0).round() / 100.0,
            surface_reflectance: round3(rng.gen_range(0.05..0.15)),
            data_quality: if rng.gen_bool(0.9) {
                RetrievalQuality::Good
            } else {
                RetrievalQuality::Moderate
            },
            cloud_contamination: rng.gen_bool(0.3),
            sun_glint: rng.gen_bool(0.1),
        }
    }

    fn sample_profile(&self) -> AtmosphericProfile {
        let mut rng = rand::thread_rng();
        let surface_temp = 28.0 + rng.gen_range(-3.0..3.0);
        let surface_humidity = 75.0 + rng.gen_range(-10.0..10.0);

        let temperature_profile_c = (0..PRESSURE_LEVELS_HPA.len())
            .map(|level| round1(surface_temp - level as f64 * LAPSE_PER_LEVEL_C))
            .collect();
        let humidity_profile_percent = PRESSURE_LEVELS_HPA
            .iter()
            .map(|p| round1((surface_humidity * (p / 1000.0).sqrt()).max(5.0)))
            .collect();

        AtmosphericProfile {
            timestamp: Utc::now(),
            satellite: INSAT_3DR.to_string(),
            pressure_levels_hpa: PRESSURE_LEVELS_HPA.to_vec(),
            temperature_profile_c,
            humidity_profile_percent,
            tropopause_height_km: round1(rng.gen_range(16.0..18.0)),
            precipitable_water_mm: round1(rng.gen_range(40.0..60.0)),
        }
    }
}

#[async_trait]
impl SatelliteFeed for SimulatedSatellite {
    async fn aerosol(&self) -> Result<AerosolObservation> {
        tokio::time::sleep(self.delay).await;
        Ok(self.sample_aerosol())
    }

    async fn atmospheric_profile(&self) -> Result<AtmosphericProfile> {
        tokio::time::sleep(self.delay).await;
        Ok(self.sample_profile())
    }
}

fn counter_network(city: City) -> Vec<TrafficCounter> {
    use VehicleType::*;

    let (prefix, named, origin): (&str, Vec<TrafficCounter>, Coordinate) = match city {
        City::Kolkata => (
            "KOL_TC",
            vec![
                TrafficCounter::new(
                    "KOL_TC_001",
                    "EM Bypass - Gariahat",
                    Coordinate::new(22.4953, 88.3665),
                    RoadType::Highway,
                    &[Cars, Buses, Trucks, Motorcycles],
                ),
                TrafficCounter::new(
                    "KOL_TC_002",
                    "VIP Road - Airport",
                    Coordinate::new(22.6533, 88.4467),
                    RoadType::Highway,
                    &[Cars, Buses, Trucks, Motorcycles],
                ),
                TrafficCounter::new(
                    "KOL_TC_003",
                    "AJC Bose Road - Park Street",
                    Coordinate::new(22.5448, 88.3426),
                    RoadType::Arterial,
                    &[Cars, Buses, AutoRickshaws, Motorcycles],
                ),
                TrafficCounter::new(
                    "KOL_TC_004",
                    "Strand Road - BBD Bagh",
                    Coordinate::new(22.5726, 88.3639),
                    RoadType::Arterial,
                    &[Cars, Buses, Trucks, AutoRickshaws],
                ),
                TrafficCounter::new(
                    "KOL_TC_005",
                    "Jessore Road - Dum Dum",
                    Coordinate::new(22.6757, 88.4372),
                    RoadType::Arterial,
                    &[Cars, Buses, Motorcycles, AutoRickshaws],
                ),
            ],
            Coordinate::new(22.4, 88.2),
        ),
        City::Dhaka => (
            "DH_TC",
            vec![
                TrafficCounter::new(
                    "DH_TC_001",
                    "Airport Road - Banani",
                    Coordinate::new(23.7937, 90.4066),
                    RoadType::Highway,
                    &[Cars, Buses, Trucks, Motorcycles],
                ),
                TrafficCounter::new(
                    "DH_TC_002",
                    "Mirpur Road - Science Lab",
                    Coordinate::new(23.7389, 90.3835),
                    RoadType::Arterial,
                    &[Cars, Buses, AutoRickshaws, Motorcycles],
                ),
            ],
            Coordinate::new(23.65, 90.30),
        ),
    };

    let road_types = [RoadType::Highway, RoadType::Arterial, RoadType::Local];
    let mut rng = rand::thread_rng();
    let start = named.len() as u32 + 1;
    let generated = (start..start + GENERATED_COUNTERS).map(|i| {
        let road_type = road_types.choose(&mut rng).copied().unwrap_or(RoadType::Local);
        TrafficCounter::new(
            format!("{}_{:03}", prefix, i),
            format!("Location_{}", i),
            Coordinate::new(
                origin.latitude + rng.gen_range(0.0..0.4),
                origin.longitude + rng.gen_range(0.0..0.4),
            ),
            road_type,
            &[Cars, Motorcycles, AutoRickshaws],
        )
    });

    named.into_iter().chain(generated.collect::<Vec<_>>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_hour_factor_bands() {
        assert_eq!(peak_hour_factor(8), 1.5);
        assert_eq!(peak_hour_factor(18), 1.5);
        assert_eq!(peak_hour_factor(12), 1.2);
        assert_eq!(peak_hour_factor(21), 1.1);
        assert_eq!(peak_hour_factor(3), 0.7);
        assert_eq!(peak_hour_factor(23), 0.7);
    }

    #[test]
    fn test_hourly_emissions() {
        assert!((hourly_emissions(VehicleType::Buses, 100) - 8.5).abs() < 1e-9);
        assert_eq!(hourly_emissions(VehicleType::Cars, 0), 0.0);
    }

    #[tokio::test]
    async fn test_forecast_capped_at_horizon() {
        let model = SimulatedWeatherModel::new(City::Kolkata, Duration::from_millis(0));
        let points = model.forecast(100).await.unwrap();
        assert_eq!(points.len(), MAX_FORECAST_HOURS as usize);
        assert_eq!(points[0].forecast_hour, 1);
        assert!(points.iter().all(|p| p.meteorology.wind_speed_ms >= 0.0));
    }

    #[tokio::test]
    async fn test_current_conditions_in_range() {
        let model = SimulatedWeatherModel::new(City::Dhaka, Duration::from_millis(0));
        let met = model.current().await.unwrap();
        assert!((2.0..=12.0).contains(&met.wind_speed_ms));
        assert!((800.0..=2000.0).contains(&met.boundary_layer_height_m));
    }

    #[tokio::test]
    async fn test_satellite_products() {
        let satellite = SimulatedSatellite::new(City::Kolkata, Duration::from_millis(0));
        let aerosol = satellite.aerosol().await.unwrap();
        assert_eq!(aerosol.satellite, INSAT_3DR);
        assert!((0.1..=1.2).contains(&aerosol.aerosol_optical_depth_550nm));

        let profile = satellite.atmospheric_profile().await.unwrap();
        assert_eq!(profile.pressure_levels_hpa.len(), profile.temperature_profile_c.len());
        assert_eq!(profile.pressure_levels_hpa.len(), profile.humidity_profile_percent.len());
        assert!(profile
            .temperature_profile_c
            .windows(2)
            .all(|pair| pair[1] < pair[0]));
        assert!(profile.humidity_profile_percent.iter().all(|h| *h >= 5.0));
    }

    #[tokio::test]
    async fn test_traffic_snapshot_counts_every_counter() {
        let monitor = SimulatedTrafficMonitor::new(City::Kolkata, Duration::from_millis(0));
        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.total_counters, 5 + GENERATED_COUNTERS as usize);
        assert_eq!(snapshot.active_counters, snapshot.total_counters);
        assert!(snapshot.total_estimated_emissions_kg_hour > 0.0);
        assert_eq!(snapshot.vehicle_counts.len(), VehicleType::ALL.len());
    }
}
