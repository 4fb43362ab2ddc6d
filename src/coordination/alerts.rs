//! Alert construction and multi-channel distribution
//!
//! Routes alerts to public and government channels. A failing channel is
//! recorded as undelivered and never stops delivery to the others.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::AlertingConfig;
use crate::domain::{
    Alert, AlertKind, AlertSeverity, City, CityTransport, Country, Language, LocalizedMessages,
    PolicyDecision,
};
use crate::error::Result;

/// Outbound alert channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Government,
    PublicSms,
    DigitalBillboards,
    MobileApp,
    SocialMedia,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Government => "government",
            Channel::PublicSms => "public_sms",
            Channel::DigitalBillboards => "digital_billboards",
            Channel::MobileApp => "mobile_app",
            Channel::SocialMedia => "social_media",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Channels used for a city pollution alert
pub const CITY_ALERT_CHANNELS: [Channel; 4] = [
    Channel::Government,
    Channel::PublicSms,
    Channel::DigitalBillboards,
    Channel::MobileApp,
];

/// Channels used for the cross-border transport alert
pub const TRANSBOUNDARY_ALERT_CHANNELS: [Channel; 1] = [Channel::Government];

/// Forecast multipliers applied to the current PM2.5
const FORECAST_DECAY: [f64; 3] = [0.9, 0.85, 0.8];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Deliver an already rendered message on one channel of `country`
    async fn deliver(&self, channel: Channel, country: Country, message: String) -> Result<()>;
}

/// Logs each delivery after a bounded delay
#[derive(Debug, Clone, Default)]
pub struct SimulatedChannel {
    delay: Duration,
}

impl SimulatedChannel {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AlertChannel for SimulatedChannel {
    async fn deliver(&self, channel: Channel, country: Country, message: String) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        info!(%channel, %country, %message, "Alert delivered");
        Ok(())
    }
}

/// Channel -> delivered
pub type DispatchReport = BTreeMap<Channel, bool>;

/// Per-country alert distribution
pub struct AlertDispatcher {
    country: Country,
    sink: Arc<dyn AlertChannel>,
}

impl AlertDispatcher {
    pub fn new(country: Country, sink: Arc<dyn AlertChannel>) -> Self {
        Self { country, sink }
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub async fn distribute(&self, alert: &Alert, channels: &[Channel]) -> DispatchReport {
        let mut report = DispatchReport::new();
        for channel in channels {
            let message = self.render(*channel, alert);
            let delivered = match self.sink.deliver(*channel, self.country, message).await {
                Ok(()) => true,
                Err(e) => {
                    error!(
                        alert_id = %alert.alert_id,
                        %channel,
                        country = %self.country,
                        error = %e,
                        "Failed to send alert"
                    );
                    false
                }
            };
            report.insert(*channel, delivered);
        }
        report
    }

    /// Channel-specific text for `alert`
    pub fn render(&self, channel: Channel, alert: &Alert) -> String {
        match channel {
            Channel::PublicSms => format_sms(self.country.regional_language(), alert),
            Channel::DigitalBillboards => format_billboard(alert),
            _ => serde_json::to_string(alert).unwrap_or_else(|_| alert.messages.english.clone()),
        }
    }

}

/// Short SMS text in `language`
fn format_sms(language: Language, alert: &Alert) -> String {
    let severity = alert.severity.as_str();
    match language {
        Language::Bengali => format!(
            "বায়ু দূষণ সতর্কতা: PM2.5 {} µg/m³. {} স্তর। সাবধানতা অবলম্বন করুন।",
            alert.current_pm25, severity
        ),
        Language::Hindi => format!(
            "वायु प्रदूषण चेतावनी: PM2.5 {} µg/m³. {} स्तर। सावधानी बरतें।",
            alert.current_pm25, severity
        ),
        Language::English => format!(
            "Air pollution alert: PM2.5 {} µg/m³. {} level. Take precautions.",
            alert.current_pm25, severity
        ),
    }
}

fn format_billboard(alert: &Alert) -> String {
    format!(
        "AIR QUALITY: {} | PM2.5: {} µg/m³ | {}",
        alert.severity.color_code(),
        alert.current_pm25,
        alert.severity.as_str().to_uppercase()
    )
}

fn alert_timestamp_id(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, now.format("%Y%m%d%H%M%S"))
}

/// Pollution alert for one city, built from its policy decision.
///
/// `recommended_actions` is carried over unchanged.
pub fn city_alert(
    decision: &PolicyDecision,
    coordination_threshold_percent: f64,
    now: DateTime<Utc>,
) -> Alert {
    let country = decision.country;
    let city = country.city();
    let category = decision.air_quality_category;
    let pm25 = decision.pm25_level;

    let mut english = format!(
        "Air Quality Alert: {} is experiencing {} air pollution levels. Current PM2.5: {} µg/m³. ",
        city.name(),
        category,
        pm25
    );
    if !decision.recommended_actions.is_empty() {
        let actions: Vec<&str> = decision.recommended_actions.iter().map(|a| a.as_str()).collect();
        english.push_str(&format!("Recommended actions: {}.", actions.join(", ")));
    }

    Alert {
        alert_id: alert_timestamp_id(country.code(), now),
        alert_type: AlertKind::PollutionSpike,
        severity: AlertSeverity::from(category),
        timestamp: now,
        origin_country: country,
        affected_countries: vec![country],
        affected_cities: vec![city],
        current_pm25: pm25,
        forecast_pm25: FORECAST_DECAY.iter().map(|f| pm25 * f).collect(),
        transboundary_contribution_percent: decision.transboundary_contribution_percent,
        recommended_actions: decision.recommended_actions.clone(),
        coordination_required: decision.transboundary_contribution_percent
            > coordination_threshold_percent,
        messages: LocalizedMessages {
            english,
            bengali: format!(
                "বায়ু দূষণ সতর্কতা: {} শহরে {} মাত্রার বায়ু দূষণ। বর্তমান PM2.5: {} µg/m³।",
                city.name(),
                category,
                pm25
            ),
            hindi: format!(
                "वायु प्रदूषण चेतावनी: {} में {} स्तर का वायु प्रदूषण। वर्तमान PM2.5: {} µg/m³।",
                city.name(),
                category,
                pm25
            ),
        },
        transport: Vec::new(),
    }
}

/// Alarm fraction configured for `country`
pub fn alarm_fraction(config: &AlertingConfig, country: Country) -> f64 {
    match country {
        Country::Bangladesh => config.bangladesh_alarm_fraction,
        Country::India => config.india_alarm_fraction,
    }
}

/// First city whose transboundary fraction exceeds its country's alarm level
pub fn transboundary_trigger<'a>(
    cities: &'a [CityTransport],
    config: &AlertingConfig,
) -> Option<&'a CityTransport> {
    cities.iter().find(|c| {
        c.transboundary_percent / 100.0 > alarm_fraction(config, c.city.country())
    })
}

/// Cross-border transport alert addressed to both governments
pub fn transboundary_alert(
    trigger: &CityTransport,
    cities: &[CityTransport],
    now: DateTime<Utc>,
) -> Alert {
    let origin = trigger.city.country();
    Alert {
        alert_id: alert_timestamp_id("TB", now),
        alert_type: AlertKind::TransboundaryTransport,
        severity: AlertSeverity::High,
        timestamp: now,
        origin_country: origin,
        affected_countries: Country::ALL.to_vec(),
        affected_cities: City::ALL.to_vec(),
        current_pm25: trigger.pm25,
        forecast_pm25: Vec::new(),
        transboundary_contribution_percent: trigger.transboundary_percent,
        recommended_actions: Vec::new(),
        coordination_required: true,
        messages: LocalizedMessages {
            english: "Significant transboundary pollution detected between Bangladesh and India"
                .to_string(),
            bengali: "বাংলাদেশ ও ভারতের মধ্যে উল্লেখযোগ্য আন্তঃসীমান্ত বায়ু দূষণ শনাক্ত হয়েছে"
                .to_string(),
            hindi: "बांग्लादेश और भारत के बीच महत्वपूर्ण सीमा-पार वायु प्रदूषण पाया गया".to_string(),
        },
        transport: cities.to_vec(),
    }
}
