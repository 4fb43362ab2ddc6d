//! Regional orchestrator
//!
//! Runs validation, apportionment, transport modelling and policy for both
//! cities, then drafts cross-border proposals and issues alerts. The
//! transboundary percentage used for policy and alarms is always the
//! transport model's adjusted coefficient × 100 (the static base pair when a
//! city has no meteorology).

use chrono::Utc;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::report::{
    CityAssessment, CityOutcome, CoordinatedAction, CoordinationOutcome, IssuedAlert,
    OrchestrationContext, OrchestrationReport, OrchestrationResult,
};
use super::state::{OrchestrationStats, OrchestratorStatus};
use crate::agents::city::panic_message;
use crate::agents::Section;
use crate::config::{AlertingConfig, AppConfig};
use crate::coordination::{
    city_alert, transboundary_alert, transboundary_trigger, AlertChannel, AlertDispatcher,
    CountryLink, ProposalBook, SimulatedChannel, SimulatedLink, CITY_ALERT_CHANNELS,
    TRANSBOUNDARY_ALERT_CHANNELS,
};
use crate::domain::{
    ActionType, City, CityObservation, CityTransport, Country, ProposalDetails, ProposalResponse,
};
use crate::error::{AqmsError, Result};
use crate::policy::PolicyEngine;
use crate::transport::{apportion, Coefficients, TransportModel};
use crate::validation::DataValidator;

const ORCHESTRATOR_NAME: &str = "regional_orchestrator";
const BILATERAL_DURATION_HOURS: u32 = 48;
const NOTIFICATION_DURATION_HOURS: u32 = 24;

pub struct RegionalOrchestrator {
    validator: DataValidator,
    transport: TransportModel,
    policy: PolicyEngine,
    alerting: AlertingConfig,
    link: Arc<dyn CountryLink>,
    dispatchers: BTreeMap<Country, AlertDispatcher>,
    stats: OrchestrationStats,
}

impl RegionalOrchestrator {
    pub fn new(config: &AppConfig, link: Arc<dyn CountryLink>, channel: Arc<dyn AlertChannel>) -> Self {
        let dispatchers = Country::ALL
            .iter()
            .map(|&country| (country, AlertDispatcher::new(country, Arc::clone(&channel))))
            .collect();

        Self {
            validator: DataValidator::new(config.validator.clone()),
            transport: TransportModel::new(),
            policy: PolicyEngine::new(config.alerting.coordination_threshold_percent),
            alerting: config.alerting.clone(),
            link,
            dispatchers,
            stats: OrchestrationStats::default(),
        }
    }

    /// Orchestrator wired to the simulated link and alert channels
    pub fn simulated(config: &AppConfig) -> Self {
        let delay = Duration::from_millis(config.alerting.simulated_delivery_ms);
        Self::new(
            config,
            Arc::new(SimulatedLink::new(delay)),
            Arc::new(SimulatedChannel::new(delay)),
        )
    }

    pub fn stats(&self) -> &OrchestrationStats {
        &self.stats
    }

    pub fn get_status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            orchestrator_name: ORCHESTRATOR_NAME.to_string(),
            status: "active".to_string(),
            orchestration_stats: self.stats.clone(),
            last_updated: Utc::now(),
        }
    }

    /// Execute one orchestration run. Never fails: errors and panics are
    /// returned as an `error` result.
    pub async fn run(&mut self, context: &OrchestrationContext) -> OrchestrationResult {
        let started = Instant::now();
        info!("Starting regional orchestration run");

        let outcome = AssertUnwindSafe(self.orchestrate(context)).catch_unwind().await;
        let elapsed = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(mut report)) => {
                report.processing_time_seconds = elapsed;
                OrchestrationResult::Success(Box::new(report))
            }
            Ok(Err(e)) => {
                error!(error = %e, "Orchestration run failed");
                OrchestrationResult::Error {
                    error: e.to_string(),
                    timestamp: Utc::now(),
                    processing_time_seconds: elapsed,
                }
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(error = %reason, "Orchestration run panicked");
                OrchestrationResult::Error {
                    error: reason,
                    timestamp: Utc::now(),
                    processing_time_seconds: elapsed,
                }
            }
        };

        let (alerts, policies) = result
            .report()
            .map(|r| (r.alerts.len(), r.cross_border_coordination.coordinated_actions().len()))
            .unwrap_or((0, 0));
        self.stats
            .record(elapsed, matches!(result, OrchestrationResult::Success(_)), alerts, policies);

        info!(
            status = result.status(),
            elapsed_secs = elapsed,
            alerts,
            policies,
            "Orchestration run finished"
        );
        result
    }

    async fn orchestrate(&self, context: &OrchestrationContext) -> Result<OrchestrationReport> {
        if context.is_empty() {
            return Err(AqmsError::Orchestration(
                "invalid or missing context data".to_string(),
            ));
        }

        let (dhaka, kolkata) = tokio::join!(
            self.process_city(City::Dhaka, context.get(City::Dhaka)),
            self.process_city(City::Kolkata, context.get(City::Kolkata)),
        );

        let cross_border_coordination = self.coordinate(&dhaka, &kolkata).await;
        let alerts = self.generate_alerts(&[&dhaka, &kolkata]).await;

        let mut cities = BTreeMap::new();
        cities.insert(City::Dhaka, dhaka);
        cities.insert(City::Kolkata, kolkata);

        Ok(OrchestrationReport {
            timestamp: Utc::now(),
            processing_time_seconds: 0.0,
            cities,
            cross_border_coordination,
            alerts,
        })
    }

    /// Per-city boundary: a panic here only fails this city
    async fn process_city(&self, city: City, observation: Option<&CityObservation>) -> CityOutcome {
        let observation = match observation {
            Some(observation) => observation,
            None => {
                debug!(city = %city, "No input data");
                return CityOutcome::NoData { city };
            }
        };

        match std::panic::catch_unwind(AssertUnwindSafe(|| self.assess(city, observation))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(city = %city, error = %reason, "City processing panicked");
                CityOutcome::Error {
                    city,
                    error: reason,
                }
            }
        }
    }

    fn assess(&self, city: City, observation: &CityObservation) -> CityOutcome {
        let country = city.country();
        if let Some(declared) = observation.country {
            if declared != country {
                warn!(city = %city, declared = %declared, "Observation country ignored");
            }
        }

        let measurement = observation.to_measurement(country);
        let validation = self.validator.validate(&measurement);
        if !validation.is_valid {
            warn!(city = %city, errors = ?validation.errors, "City observation rejected");
            return CityOutcome::ValidationFailed {
                city,
                errors: validation.errors,
                warnings: validation.warnings,
            };
        }

        let emission_analysis = apportion(&measurement);
        let transport = match observation.meteorology {
            Some(met) => Section::Available {
                data: self.transport.model_transport(&met, country),
            },
            None => Section::unavailable("no meteorology supplied with the observation"),
        };
        let effective_coefficients = transport
            .data()
            .map(|t| t.adjusted_coefficients)
            .unwrap_or_else(|| Coefficients::base(country));
        let transboundary_percent = effective_coefficients.transboundary_percent();
        let policy = self
            .policy
            .decide(observation.pm25, country, transboundary_percent);

        debug!(
            city = %city,
            pm25 = observation.pm25,
            transboundary_percent,
            category = %policy.air_quality_category,
            coordination = policy.cross_border_coordination_needed,
            "City assessed"
        );

        CityOutcome::Success(Box::new(CityAssessment {
            city,
            country,
            pm25: observation.pm25,
            timestamp: observation.timestamp.clone(),
            validation,
            emission_analysis,
            transport,
            effective_coefficients,
            transboundary_percent,
            policy,
        }))
    }

    async fn coordinate(&self, dhaka: &CityOutcome, kolkata: &CityOutcome) -> CoordinationOutcome {
        let needs = (dhaka.needs_coordination(), kolkata.needs_coordination());
        if needs == (false, false) {
            return CoordinationOutcome::NotNeeded;
        }

        let mut book = ProposalBook::new(Arc::clone(&self.link));
        match self.open_proposals(&mut book, dhaka, kolkata).await {
            Ok(coordinated_actions) => CoordinationOutcome::Success {
                coordinated_actions,
                timestamp: Utc::now(),
            },
            Err(e) => {
                error!(error = %e, "Cross-border coordination failed");
                CoordinationOutcome::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn open_proposals(
        &self,
        book: &mut ProposalBook,
        dhaka: &CityOutcome,
        kolkata: &CityOutcome,
    ) -> Result<Vec<CoordinatedAction>> {
        let (proposer, action_type, details) = match (dhaka.assessment(), kolkata.assessment()) {
            (Some(d), Some(k))
                if d.policy.cross_border_coordination_needed
                    && k.policy.cross_border_coordination_needed =>
            {
                let details = ProposalDetails::Bilateral {
                    dhaka_pm25: d.pm25,
                    kolkata_pm25: k.pm25,
                    dhaka_actions: d.policy.recommended_actions.clone(),
                    kolkata_actions: k.policy.recommended_actions.clone(),
                    implementation_time: Utc::now(),
                    duration_hours: BILATERAL_DURATION_HOURS,
                };
                (Country::Bangladesh, ActionType::BilateralEmergencyResponse, details)
            }
            _ => {
                let requester = [dhaka, kolkata]
                    .into_iter()
                    .filter(|c| c.needs_coordination())
                    .find_map(|c| c.assessment())
                    .ok_or_else(|| {
                        AqmsError::Orchestration("no city requested coordination".to_string())
                    })?;
                let details = ProposalDetails::Notification {
                    source_country: requester.country,
                    pm25_level: requester.pm25,
                    transboundary_contribution_percent: requester.transboundary_percent,
                    requested_actions: vec![requested_action(requester.country).to_string()],
                    duration_hours: NOTIFICATION_DURATION_HOURS,
                };
                (requester.country, ActionType::TransboundaryNotification, details)
            }
        };

        let proposal_id = book.propose(proposer, action_type, details).await?;
        if action_type == ActionType::BilateralEmergencyResponse {
            book.respond(
                &proposal_id,
                proposer.neighbor(),
                ProposalResponse::Accept,
                "joint emergency response accepted",
            )?;
        }

        let proposal = book
            .get(&proposal_id)
            .ok_or_else(|| AqmsError::ProposalNotFound(proposal_id.clone()))?;

        Ok(vec![CoordinatedAction {
            proposal_id: proposal.proposal_id.clone(),
            action_type: proposal.action_type,
            status: proposal.status,
            participating_countries: proposal.participating_countries(),
            details: proposal.details.clone(),
        }])
    }

    async fn generate_alerts(&self, outcomes: &[&CityOutcome]) -> Vec<IssuedAlert> {
        let now = Utc::now();
        let assessed: Vec<&CityAssessment> = outcomes.iter().filter_map(|o| o.assessment()).collect();
        let mut alerts = Vec::new();

        for assessment in &assessed {
            if !assessment.policy.air_quality_category.is_critical() {
                continue;
            }
            let alert = city_alert(
                &assessment.policy,
                self.policy.coordination_threshold_percent(),
                now,
            );
            let mut distribution = BTreeMap::new();
            if let Some(dispatcher) = self.dispatchers.get(&assessment.country) {
                distribution.insert(
                    assessment.country,
                    dispatcher.distribute(&alert, &CITY_ALERT_CHANNELS).await,
                );
            }
            info!(alert_id = %alert.alert_id, city = %assessment.city, severity = %alert.severity, "City alert issued");
            alerts.push(IssuedAlert { alert, distribution });
        }

        let transport: Vec<CityTransport> = assessed
            .iter()
            .map(|a| CityTransport {
                city: a.city,
                pm25: a.pm25,
                transboundary_percent: a.transboundary_percent,
            })
            .collect();

        // The cross-border alarm compares both sides, so it needs both cities
        if transport.len() < City::ALL.len() {
            return alerts;
        }
        if let Some(trigger) = transboundary_trigger(&transport, &self.alerting) {
            let alert = transboundary_alert(trigger, &transport, now);
            let mut distribution = BTreeMap::new();
            for (country, dispatcher) in &self.dispatchers {
                distribution.insert(
                    *country,
                    dispatcher
                        .distribute(&alert, &TRANSBOUNDARY_ALERT_CHANNELS)
                        .await,
                );
            }
            info!(alert_id = %alert.alert_id, origin = %alert.origin_country, "Transboundary alert issued");
            alerts.push(IssuedAlert { alert, distribution });
        }

        alerts
    }
}

/// Action requested from the neighbour in a unilateral notification
fn requested_action(requester: Country) -> &'static str {
    match requester {
        Country::Bangladesh => "industrial_emission_reduction",
        Country::India => "brick_kiln_emission_reduction",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{MockAlertChannel, MockCountryLink};
    use crate::domain::{AirQualityCategory, AlertKind, Meteorology, ProposalStatus};

    fn ok_link() -> Arc<dyn CountryLink> {
        let mut link = MockCountryLink::new();
        link.expect_send().returning(|_| Ok(()));
        Arc::new(link)
    }

    fn ok_channel() -> Arc<dyn AlertChannel> {
        let mut channel = MockAlertChannel::new();
        channel.expect_deliver().returning(|_, _, _| Ok(()));
        Arc::new(channel)
    }

    fn orchestrator() -> RegionalOrchestrator {
        RegionalOrchestrator::new(&AppConfig::default(), ok_link(), ok_channel())
    }

    fn observation(pm25: f64, met: Meteorology) -> CityObservation {
        CityObservation::new(pm25, Utc::now().to_rfc3339()).with_meteorology(met)
    }

    // Westerly into Dhaka and easterly into Kolkata, shallow mixing layer
    fn dhaka_inflow() -> Meteorology {
        Meteorology::new(6.0, 270.0, 400.0)
    }

    fn kolkata_inflow() -> Meteorology {
        Meteorology::new(6.0, 90.0, 400.0)
    }

    #[tokio::test]
    async fn test_no_data_city_does_not_fail_run() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(Some(observation(139.0, dhaka_inflow())), None);
        let result = orch.run(&ctx).await;

        let report = result.report().expect("success");
        assert_eq!(report.city(City::Kolkata).unwrap().status(), "no_data");
        assert_eq!(report.city(City::Dhaka).unwrap().status(), "success");
    }

    #[tokio::test]
    async fn test_empty_context_is_run_error() {
        let mut orch = orchestrator();
        let result = orch.run(&OrchestrationContext::default()).await;
        assert_eq!(result.status(), "error");
        assert_eq!(orch.stats().total_runs, 1);
        assert_eq!(orch.stats().successful_runs, 0);
    }

    #[tokio::test]
    async fn test_invalid_observation_is_validation_failed() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(
            Some(CityObservation::new(-0.01, Utc::now().to_rfc3339())),
            Some(observation(45.6, kolkata_inflow())),
        );
        let result = orch.run(&ctx).await;
        let report = result.report().unwrap();
        match report.city(City::Dhaka).unwrap() {
            CityOutcome::ValidationFailed { errors, .. } => assert!(!errors.is_empty()),
            other => panic!("unexpected status {}", other.status()),
        }
    }

    #[tokio::test]
    async fn test_missing_meteorology_uses_base_coefficients() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(
            Some(CityObservation::new(160.0, Utc::now().to_rfc3339())),
            None,
        );
        let result = orch.run(&ctx).await;
        let assessment = result
            .report()
            .and_then(|r| r.city(City::Dhaka))
            .and_then(|c| c.assessment())
            .cloned()
            .unwrap();

        assert!(!assessment.transport.is_available());
        assert_eq!(assessment.effective_coefficients, Coefficients::base(Country::Bangladesh));
        assert!((assessment.transboundary_percent - 62.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_single_city_coordination_stays_proposed() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(
            Some(observation(170.0, dhaka_inflow())),
            Some(observation(45.6, kolkata_inflow())),
        );
        let result = orch.run(&ctx).await;
        let report = result.report().unwrap();

        let actions = report.cross_border_coordination.coordinated_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::TransboundaryNotification);
        assert_eq!(actions[0].status, ProposalStatus::Proposed);
        match &actions[0].details {
            ProposalDetails::Notification {
                source_country,
                requested_actions,
                duration_hours,
                ..
            } => {
                assert_eq!(*source_country, Country::Bangladesh);
                assert_eq!(requested_actions, &vec!["industrial_emission_reduction".to_string()]);
                assert_eq!(*duration_hours, 24);
            }
            other => panic!("unexpected details {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kolkata_alone_requests_brick_kiln_reduction() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(None, Some(observation(130.0, kolkata_inflow())));
        let result = orch.run(&ctx).await;
        let actions = result.report().unwrap().cross_border_coordination.coordinated_actions().to_vec();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].participating_countries, vec![Country::India, Country::Bangladesh]);
        match &actions[0].details {
            ProposalDetails::Notification { requested_actions, .. } => {
                assert_eq!(requested_actions[0], "brick_kiln_emission_reduction");
            }
            other => panic!("unexpected details {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_critical_is_approved_bilateral() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(
            Some(observation(185.0, dhaka_inflow())),
            Some(observation(150.0, kolkata_inflow())),
        );
        let result = orch.run(&ctx).await;
        let report = result.report().unwrap();

        let actions = report.cross_border_coordination.coordinated_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::BilateralEmergencyResponse);
        assert_eq!(actions[0].status, ProposalStatus::Approved);

        let city_alerts = report
            .alerts
            .iter()
            .filter(|a| a.alert.alert_type == AlertKind::PollutionSpike)
            .count();
        assert_eq!(city_alerts, 2);
        assert_eq!(orch.stats().policies_coordinated, 1);
        assert_eq!(orch.stats().alerts_generated, report.alerts.len() as u64);
    }

    #[tokio::test]
    async fn test_transboundary_alert_goes_to_both_governments() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(
            Some(observation(120.0, dhaka_inflow())),
            Some(observation(45.6, Meteorology::new(4.2, 270.0, 1200.0))),
        );
        let result = orch.run(&ctx).await;
        let report = result.report().unwrap();

        let assessment = report.city(City::Dhaka).and_then(|c| c.assessment()).unwrap();
        assert_eq!(assessment.policy.air_quality_category, AirQualityCategory::Poor);
        assert!(assessment.transboundary_percent > 50.0);

        let tb = report
            .alerts
            .iter()
            .find(|a| a.alert.alert_type == AlertKind::TransboundaryTransport)
            .expect("transboundary alert");
        assert_eq!(tb.alert.origin_country, Country::Bangladesh);
        assert_eq!(tb.distribution.len(), 2);
        assert!(tb.distribution.values().all(|r| r.len() == 1));
        assert_eq!(tb.alert.transport.len(), 2);
    }

    #[tokio::test]
    async fn test_single_city_never_raises_transboundary_alert() {
        let mut orch = orchestrator();
        let ctx = OrchestrationContext::new(Some(observation(120.0, dhaka_inflow())), None);
        let result = orch.run(&ctx).await;
        assert!(result.report().unwrap().alerts.is_empty());
    }

    #[tokio::test]
    async fn test_failing_channels_do_not_fail_run() {
        let mut channel = MockAlertChannel::new();
        channel.expect_deliver().returning(|channel, _, _| {
            Err(AqmsError::Channel {
                channel: channel.to_string(),
                reason: "gateway down".to_string(),
            })
        });
        let mut orch = RegionalOrchestrator::new(&AppConfig::default(), ok_link(), Arc::new(channel));
        let ctx = OrchestrationContext::new(Some(observation(210.0, dhaka_inflow())), None);

        let result = orch.run(&ctx).await;
        let report = result.report().unwrap();
        let city_alert = &report.alerts[0];
        assert_eq!(city_alert.distribution[&Country::Bangladesh].len(), 4);
        assert!(city_alert.distribution[&Country::Bangladesh].values().all(|d| !d));
    }
}
