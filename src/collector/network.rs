//! Static monitoring networks for each city

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{City, Coordinate, Country, InstrumentType, MeasurementType, SensorConfig};

const DHAKA_GOVERNMENT_STATIONS: &[(&str, f64, f64)] = &[
    ("Dhanmondi", 23.7461, 90.3742),
    ("Farmgate", 23.7588, 90.3892),
    ("Tejgaon", 23.7633, 90.3950),
    ("Ramna", 23.7370, 90.3947),
    ("Gulshan", 23.7925, 90.4078),
    ("Uttara", 23.8759, 90.3795),
    ("Old Dhaka", 23.7104, 90.4074),
    ("Motijheel", 23.7330, 90.4172),
    ("Mirpur", 23.8103, 90.3654),
    ("Wari", 23.7208, 90.4264),
    ("Savar", 23.8583, 90.2667),
    ("Gazipur", 23.9999, 90.4203),
    ("Narayanganj", 23.6238, 90.4969),
    ("Keraniganj", 23.6792, 90.3542),
    ("Tongi", 23.8979, 90.4026),
];

const KOLKATA_GOVERNMENT_STATIONS: &[(&str, f64, f64)] = &[
    ("Victoria Memorial", 22.5448, 88.3426),
    ("Ballygunge", 22.5280, 88.3659),
    ("Jadavpur", 22.4990, 88.3714),
    ("Rabindra Bharati", 22.6270, 88.3800),
    ("Fort William", 22.5550, 88.3400),
    ("Bidhannagar", 22.5850, 88.4150),
    ("Rabindra Sarobar", 22.5120, 88.3630),
];

const DHAKA_LOW_COST_SENSORS: u32 = 32;
const KOLKATA_LOW_COST_SENSORS: u32 = 20;

/// Full sensor network for a city
pub fn network_for(city: City) -> Vec<SensorConfig> {
    match city {
        City::Dhaka => build_network(
            Country::Bangladesh,
            "DH",
            DHAKA_GOVERNMENT_STATIONS,
            DHAKA_LOW_COST_SENSORS,
            Coordinate::new(23.70, 90.35),
        ),
        City::Kolkata => build_network(
            Country::India,
            "KOL",
            KOLKATA_GOVERNMENT_STATIONS,
            KOLKATA_LOW_COST_SENSORS,
            Coordinate::new(22.45, 88.30),
        ),
    }
}

fn build_network(
    country: Country,
    prefix: &str,
    stations: &[(&str, f64, f64)],
    low_cost: u32,
    grid_origin: Coordinate,
) -> Vec<SensorConfig> {
    let government = stations.iter().enumerate().map(|(idx, (name, lat, lon))| {
        // Reference instruments alternate between BAM and TEOM sites
        let instrument = if idx % 2 == 0 {
            InstrumentType::Bam
        } else {
            InstrumentType::Teom
        };
        SensorConfig::new(
            format!("{}_GOV_{:03}", prefix, idx + 1),
            *name,
            country,
            Coordinate::new(*lat, *lon),
            instrument,
        )
    });

    let optical = (1..=low_cost).map(|i| {
        let step = f64::from(i) * 0.01;
        SensorConfig::new(
            format!("{}_LC_{:03}", prefix, i),
            format!("LowCost_{}", i),
            country,
            Coordinate::new(grid_origin.latitude + step, grid_origin.longitude + step),
            InstrumentType::PurpleAir,
        )
    });

    government.chain(optical).collect()
}

/// Per-category active counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub total_sensors: usize,
    pub active_sensors: usize,
    pub government_stations: CategoryCount,
    pub low_cost_sensors: CategoryCount,
    pub last_updated: DateTime<Utc>,
}

pub fn sensor_status(sensors: &[SensorConfig]) -> NetworkStatus {
    let count = |category: MeasurementType| {
        sensors
            .iter()
            .filter(|s| s.category() == category)
            .fold(CategoryCount::default(), |mut acc, s| {
                acc.total += 1;
                if s.is_active {
                    acc.active += 1;
                }
                acc
            })
    };

    NetworkStatus {
        total_sensors: sensors.len(),
        active_sensors: sensors.iter().filter(|s| s.is_active).count(),
        government_stations: count(MeasurementType::Government),
        low_cost_sensors: count(MeasurementType::LowCost),
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_dhaka_network_shape() {
        let sensors = network_for(City::Dhaka);
        assert_eq!(sensors.len(), 15 + 32);
        assert!(sensors.iter().all(|s| s.country == Country::Bangladesh));
        assert_eq!(sensors[0].station_id, "DH_GOV_001");
        assert_eq!(sensors[0].station_name, "Dhanmondi");
        assert_eq!(sensors[15].station_id, "DH_LC_001");
        assert_eq!(sensors[15].instrument, InstrumentType::PurpleAir);
    }

    #[test]
    fn test_station_ids_unique() {
        for city in City::ALL {
            let sensors = network_for(city);
            let ids: HashSet<_> = sensors.iter().map(|s| s.station_id.as_str()).collect();
            assert_eq!(ids.len(), sensors.len());
        }
    }

    #[test]
    fn test_sensor_status_counts_inactive() {
        let mut sensors = network_for(City::Kolkata);
        sensors[0].is_active = false;
        let status = sensor_status(&sensors);
        assert_eq!(status.total_sensors, 27);
        assert_eq!(status.active_sensors, 26);
        assert_eq!(status.government_stations.total, 7);
        assert_eq!(status.government_stations.active, 6);
        assert_eq!(status.low_cost_sensors.active, 20);
    }
}
