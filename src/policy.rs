//! Policy decision engine
//!
//! Table lookups only. `decide` is a pure function of its inputs.

use crate::domain::{
    AirQualityCategory, Country, ExpectedImpact, PolicyAction, PolicyDecision, Priority,
};

/// Default transboundary share (percent) above which a critical category
/// requires cross-border coordination
pub const DEFAULT_COORDINATION_THRESHOLD_PERCENT: f64 = 30.0;

/// Lower PM2.5 bound (µg/m³) of each category above `good`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryThresholds {
    pub emergency: f64,
    pub severe: f64,
    pub poor: f64,
    pub moderate: f64,
}

impl CategoryThresholds {
    pub fn for_country(country: Country) -> Self {
        match country {
            Country::Bangladesh => Self {
                emergency: 200.0,
                severe: 150.0,
                poor: 100.0,
                moderate: 50.0,
            },
            Country::India => Self {
                emergency: 180.0,
                severe: 120.0,
                poor: 90.0,
                moderate: 50.0,
            },
        }
    }

    /// Highest category whose threshold `pm25` reaches
    pub fn categorize(&self, pm25: f64) -> AirQualityCategory {
        if pm25 >= self.emergency {
            AirQualityCategory::Emergency
        } else if pm25 >= self.severe {
            AirQualityCategory::Severe
        } else if pm25 >= self.poor {
            AirQualityCategory::Poor
        } else if pm25 >= self.moderate {
            AirQualityCategory::Moderate
        } else {
            AirQualityCategory::Good
        }
    }
}

/// Interventions ordered for a country at a given category
pub fn actions_for(country: Country, category: AirQualityCategory) -> &'static [PolicyAction] {
    use AirQualityCategory as C;
    use PolicyAction::*;

    match (country, category) {
        (Country::Bangladesh, C::Emergency) => &[BrickKilnShutdown, OddEvenVehicles, SchoolClosure],
        (Country::Bangladesh, C::Severe) => &[BrickKilnShutdown, ConstructionHalt],
        (Country::Bangladesh, C::Poor) => &[ConstructionHalt, StreetWatering],
        (Country::India, C::Emergency) => &[OddEvenVehicles, SchoolClosure, IndustrialAudit],
        (Country::India, C::Severe) => &[SchoolClosure, IndustrialAudit],
        (Country::India, C::Poor) => &[IndustrialAudit, StreetWatering],
        (_, C::Moderate) => &[StreetWatering, PublicAdvisory],
        (_, C::Good) => &[],
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyEngine {
    coordination_threshold_percent: f64,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COORDINATION_THRESHOLD_PERCENT)
    }
}

impl PolicyEngine {
    pub fn new(coordination_threshold_percent: f64) -> Self {
        Self {
            coordination_threshold_percent,
        }
    }

    pub fn coordination_threshold_percent(&self) -> f64 {
        self.coordination_threshold_percent
    }

    pub fn decide(&self, pm25: f64, country: Country, transboundary_percent: f64) -> PolicyDecision {
        let category = CategoryThresholds::for_country(country).categorize(pm25);
        let critical = category.is_critical();

        PolicyDecision {
            country,
            pm25_level: pm25,
            air_quality_category: category,
            recommended_actions: actions_for(country, category).to_vec(),
            transboundary_contribution_percent: transboundary_percent,
            cross_border_coordination_needed: critical
                && transboundary_percent > self.coordination_threshold_percent,
            implementation_priority: if critical { Priority::High } else { Priority::Normal },
            expected_impact: if critical {
                ExpectedImpact::Significant
            } else {
                ExpectedImpact::Moderate
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dhaka_139_is_poor_without_coordination() {
        let decision = PolicyEngine::default().decide(139.0, Country::Bangladesh, 75.0);
        assert_eq!(decision.air_quality_category, AirQualityCategory::Poor);
        assert!(!decision.cross_border_coordination_needed);
        assert_eq!(
            decision.recommended_actions,
            vec![PolicyAction::ConstructionHalt, PolicyAction::StreetWatering]
        );
        assert_eq!(decision.implementation_priority, Priority::Normal);
    }

    #[test]
    fn test_kolkata_45_6_is_good() {
        let decision = PolicyEngine::default().decide(45.6, Country::India, 40.0);
        assert_eq!(decision.air_quality_category, AirQualityCategory::Good);
        assert!(decision.recommended_actions.is_empty());
        assert!(!decision.cross_border_coordination_needed);
    }

    #[test]
    fn test_threshold_edges_inclusive() {
        let bd = CategoryThresholds::for_country(Country::Bangladesh);
        assert_eq!(bd.categorize(200.0), AirQualityCategory::Emergency);
        assert_eq!(bd.categorize(199.9), AirQualityCategory::Severe);
        assert_eq!(bd.categorize(150.0), AirQualityCategory::Severe);
        assert_eq!(bd.categorize(100.0), AirQualityCategory::Poor);
        assert_eq!(bd.categorize(50.0), AirQualityCategory::Moderate);
        assert_eq!(bd.categorize(49.9), AirQualityCategory::Good);

        let india = CategoryThresholds::for_country(Country::India);
        assert_eq!(india.categorize(180.0), AirQualityCategory::Emergency);
        assert_eq!(india.categorize(120.0), AirQualityCategory::Severe);
        assert_eq!(india.categorize(90.0), AirQualityCategory::Poor);
    }

    #[test]
    fn test_coordination_requires_critical_and_share_above_30() {
        let engine = PolicyEngine::default();
        assert!(engine.decide(160.0, Country::Bangladesh, 30.1).cross_border_coordination_needed);
        assert!(!engine.decide(160.0, Country::Bangladesh, 30.0).cross_border_coordination_needed);
        assert!(!engine.decide(140.0, Country::Bangladesh, 90.0).cross_border_coordination_needed);

        let emergency = engine.decide(250.0, Country::India, 45.0);
        assert!(emergency.cross_border_coordination_needed);
        assert_eq!(emergency.implementation_priority, Priority::High);
        assert_eq!(emergency.expected_impact, ExpectedImpact::Significant);
    }

    #[test]
    fn test_non_good_categories_have_actions() {
        for country in Country::ALL {
            for category in AirQualityCategory::ALL {
                let actions = actions_for(country, category);
                if category >= AirQualityCategory::Poor {
                    assert!(!actions.is_empty(), "{} {} has no actions", country, category);
                }
            }
        }
    }

    #[test]
    fn test_decide_is_pure() {
        let engine = PolicyEngine::default();
        for pm25 in [0.0, 49.9, 95.0, 130.0, 199.0, 500.0] {
            for country in Country::ALL {
                assert_eq!(
                    engine.decide(pm25, country, 42.0),
                    engine.decide(pm25, country, 42.0)
                );
            }
        }
    }
}
