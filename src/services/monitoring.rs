//! Service facade over both city agents and the regional orchestrator
//!
//! Entry points used by the CLI and by any outer HTTP layer. Every call
//! returns a plain record with a `status` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::agents::{CityAgent, CollectionResult, CollectionStats, NeighborExchange};
use crate::collector::NetworkStatus;
use crate::config::AppConfig;
use crate::coordination::{CityAggregate, SimulatedLink};
use crate::coordinator::{
    OrchestrationContext, OrchestrationResult, OrchestratorStatus, RegionalOrchestrator,
};
use crate::domain::City;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub city: City,
    pub collection_stats: CollectionStats,
    pub sensor_status: NetworkStatus,
    pub neighbor_data: Option<CityAggregate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub agents: BTreeMap<City, AgentStatus>,
    pub orchestrator: OrchestratorStatus,
    pub timestamp: DateTime<Utc>,
}

/// Collection for both cities followed by orchestration on their aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Status of the orchestration step
    pub status: String,
    pub collections: BTreeMap<City, CollectionResult>,
    /// What each agent accepted from its neighbour after the round
    pub exchange: BTreeMap<City, NeighborExchange>,
    pub context: OrchestrationContext,
    pub orchestration: OrchestrationResult,
    pub timestamp: DateTime<Utc>,
}

pub struct MonitoringService {
    dhaka: CityAgent,
    kolkata: CityAgent,
    orchestrator: RegionalOrchestrator,
}

impl MonitoringService {
    pub fn new(dhaka: CityAgent, kolkata: CityAgent, orchestrator: RegionalOrchestrator) -> Self {
        Self {
            dhaka,
            kolkata,
            orchestrator,
        }
    }

    /// Both agents share one simulated link, so each receives the other's aggregate
    pub fn simulated(config: &AppConfig) -> Self {
        let delivery = Duration::from_millis(config.alerting.simulated_delivery_ms);
        let link = Arc::new(SimulatedLink::new(delivery));
        Self::new(
            CityAgent::simulated(City::Dhaka, link.clone(), config),
            CityAgent::simulated(City::Kolkata, link, config),
            RegionalOrchestrator::simulated(config),
        )
    }

    fn agent_mut(&mut self, city: City) -> &mut CityAgent {
        match city {
            City::Dhaka => &mut self.dhaka,
            City::Kolkata => &mut self.kolkata,
        }
    }

    pub async fn run_collection(&mut self, city: City) -> CollectionResult {
        self.agent_mut(city).run_collection().await
    }

    pub async fn run_orchestration(&mut self, context: &OrchestrationContext) -> OrchestrationResult {
        self.orchestrator.run(context).await
    }

    pub async fn run_pipeline(&mut self) -> PipelineResult {
        info!("Starting full pipeline");
        let (dhaka, kolkata) = tokio::join!(
            self.dhaka.run_collection(),
            self.kolkata.run_collection(),
        );

        let (dhaka_exchange, kolkata_exchange) = tokio::join!(
            self.dhaka.receive_neighbor_data(),
            self.kolkata.receive_neighbor_data(),
        );
        let mut exchange = BTreeMap::new();
        exchange.insert(City::Dhaka, dhaka_exchange);
        exchange.insert(City::Kolkata, kolkata_exchange);

        let context = OrchestrationContext::new(
            dhaka.observation().cloned(),
            kolkata.observation().cloned(),
        );
        let orchestration = self.orchestrator.run(&context).await;

        let mut collections = BTreeMap::new();
        collections.insert(City::Dhaka, dhaka);
        collections.insert(City::Kolkata, kolkata);

        PipelineResult {
            status: orchestration.status().to_string(),
            collections,
            exchange,
            context,
            orchestration,
            timestamp: Utc::now(),
        }
    }

    pub fn get_status(&self) -> ServiceStatus {
        let agents = [&self.dhaka, &self.kolkata]
            .into_iter()
            .map(|agent| {
                (
                    agent.city(),
                    AgentStatus {
                        city: agent.city(),
                        collection_stats: agent.stats().clone(),
                        sensor_status: agent.sensor_status(),
                        neighbor_data: agent.neighbor_data().cloned(),
                    },
                )
            })
            .collect();

        ServiceStatus {
            status: "active".to_string(),
            agents,
            orchestrator: self.orchestrator.get_status(),
            timestamp: Utc::now(),
        }
    }
}
