//! Agent-to-agent exchange between the two national agents

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{parse_timestamp, City, Coordinate, Country};
use crate::error::{AqmsError, Result};

pub const PROTOCOL_VERSION: &str = "A2A/1.0";

/// Incoming PM2.5 outside this range is rejected (µg/m³)
const MAX_INCOMING_PM25: f64 = 1000.0;
/// Incoming data older than this is rejected
const MAX_INCOMING_AGE_HOURS: i64 = 24;
/// Undelivered messages kept per receiving country; the oldest is dropped first
const INBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AirQualityData,
    PolicyProposal,
    PolicyResponse,
}

pub fn agent_id(country: Country) -> String {
    format!("{}_aqms_agent", country.code())
}

/// Envelope for everything sent across the border
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2aMessage {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub protocol_version: String,
    pub sender_agent_id: String,
    pub sender_country: Country,
    pub receiver_agent_id: String,
    pub receiver_country: Country,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub priority: MessagePriority,
}

impl A2aMessage {
    /// Message from `sender` to its neighbour
    pub fn to_neighbor(sender: Country, message_type: MessageType, payload: serde_json::Value) -> Self {
        let receiver = sender.neighbor();
        Self {
            message_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            sender_agent_id: agent_id(sender),
            sender_country: sender,
            receiver_agent_id: agent_id(receiver),
            receiver_country: receiver,
            message_type,
            payload,
            priority: MessagePriority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }
}

/// City summary shared with the neighbouring agent after each collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityAggregate {
    pub city: City,
    pub country: Country,
    /// Mean over valid measurements
    pub pm25: f64,
    pub pm25_max: f64,
    pub pm25_min: f64,
    pub measurement_count: usize,
    pub timestamp: String,
    pub coordinates: Coordinate,
}

/// "Send to country" primitive plus the matching inbox
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountryLink: Send + Sync {
    async fn send(&self, message: A2aMessage) -> Result<()>;

    /// Drain messages addressed to `country`. Send-only links have no inbox.
    async fn receive(&self, _country: Country) -> Result<Vec<A2aMessage>> {
        Ok(Vec::new())
    }
}

/// In-process link: logs each message after a bounded transmission delay and
/// queues it for the receiving country
#[derive(Debug, Default)]
pub struct SimulatedLink {
    delay: Duration,
    sent: AtomicU64,
    inbox: Mutex<BTreeMap<Country, VecDeque<A2aMessage>>>,
}

impl SimulatedLink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CountryLink for SimulatedLink {
    async fn send(&self, message: A2aMessage) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(
            message_id = %message.message_id,
            from = %message.sender_country,
            to = %message.receiver_country,
            message_type = ?message.message_type,
            "A2A message transmitted"
        );

        let mut inbox = self.inbox.lock().await;
        let queue = inbox.entry(message.receiver_country).or_default();
        if queue.len() >= INBOX_CAPACITY {
            if let Some(dropped) = queue.pop_front() {
                warn!(message_id = %dropped.message_id, "Inbox full, oldest message dropped");
            }
        }
        queue.push_back(message);
        Ok(())
    }

    async fn receive(&self, country: Country) -> Result<Vec<A2aMessage>> {
        let mut inbox = self.inbox.lock().await;
        Ok(inbox
            .get_mut(&country)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default())
    }
}

/// Accept a neighbour's air quality message addressed to `receiver`.
///
/// The payload must pass [`validate_incoming`] and decode as a [`CityAggregate`].
pub fn accept_incoming(message: &A2aMessage, receiver: Country) -> Result<CityAggregate> {
    if message.receiver_country != receiver {
        return Err(AqmsError::Validation(format!(
            "message {} addressed to {}, not {}",
            message.message_id, message.receiver_country, receiver
        )));
    }
    if message.message_type != MessageType::AirQualityData {
        return Err(AqmsError::Validation(format!(
            "message {} is {:?}, not air quality data",
            message.message_id, message.message_type
        )));
    }
    validate_incoming(&message.payload)?;
    let aggregate: CityAggregate = serde_json::from_value(message.payload.clone())?;
    if aggregate.country != message.sender_country {
        return Err(AqmsError::Validation(format!(
            "payload country {} does not match sender {}",
            aggregate.country, message.sender_country
        )));
    }
    Ok(aggregate)
}

/// Check a payload received from the neighbour
pub fn validate_incoming(payload: &serde_json::Value) -> Result<()> {
    validate_incoming_at(payload, Utc::now())
}

pub fn validate_incoming_at(payload: &serde_json::Value, now: DateTime<Utc>) -> Result<()> {
    let reject = |reason: String| {
        debug!(%reason, "Rejected incoming payload");
        Err(AqmsError::Validation(reason))
    };

    for field in ["pm25", "timestamp", "coordinates"] {
        if payload.get(field).is_none() {
            return reject(format!("missing field: {}", field));
        }
    }

    let pm25 = match payload.get("pm25").and_then(|v| v.as_f64()) {
        Some(v) => v,
        None => return reject("pm25 is not a number".to_string()),
    };
    if !(0.0..=MAX_INCOMING_PM25).contains(&pm25) {
        return reject(format!("pm25 {} outside 0-{}", pm25, MAX_INCOMING_PM25));
    }

    let ts = match payload
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp)
    {
        Some(ts) => ts,
        None => return reject("unparsable timestamp".to_string()),
    };
    if now - ts > ChronoDuration::hours(MAX_INCOMING_AGE_HOURS) {
        return reject(format!("data older than {}h", MAX_INCOMING_AGE_HOURS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(pm25: f64, timestamp: &str) -> serde_json::Value {
        json!({
            "pm25": pm25,
            "timestamp": timestamp,
            "coordinates": { "latitude": 23.81, "longitude": 90.41 },
        })
    }

    #[test]
    fn test_message_addressed_to_neighbor() {
        let msg = A2aMessage::to_neighbor(Country::Bangladesh, MessageType::AirQualityData, json!({}));
        assert_eq!(msg.receiver_country, Country::India);
        assert_eq!(msg.sender_agent_id, "BD_aqms_agent");
        assert_eq!(msg.receiver_agent_id, "IN_aqms_agent");
        assert_eq!(msg.protocol_version, "A2A/1.0");
        assert_eq!(msg.priority, MessagePriority::Normal);
    }

    #[test]
    fn test_validate_incoming() {
        let now = Utc::now();
        let fresh = (now - ChronoDuration::hours(1)).to_rfc3339();
        let stale = (now - ChronoDuration::hours(25)).to_rfc3339();

        assert!(validate_incoming_at(&payload(120.0, &fresh), now).is_ok());
        assert!(validate_incoming_at(&payload(0.0, &fresh), now).is_ok());
        assert!(validate_incoming_at(&payload(1000.0, &fresh), now).is_ok());
        assert!(validate_incoming_at(&payload(1000.1, &fresh), now).is_err());
        assert!(validate_incoming_at(&payload(-1.0, &fresh), now).is_err());
        assert!(validate_incoming_at(&payload(120.0, &stale), now).is_err());
        assert!(validate_incoming_at(&payload(120.0, "not a time"), now).is_err());
        assert!(validate_incoming_at(&json!({ "pm25": 10.0, "timestamp": fresh }), now).is_err());
    }

    #[test]
    fn test_shared_aggregate_passes_incoming_checks() {
        let aggregate = CityAggregate {
            city: City::Dhaka,
            country: Country::Bangladesh,
            pm25: 131.2,
            pm25_max: 170.0,
            pm25_min: 90.5,
            measurement_count: 47,
            timestamp: Utc::now().to_rfc3339(),
            coordinates: Coordinate::new(23.81, 90.41),
        };
        let value = serde_json::to_value(&aggregate).unwrap();
        assert!(validate_incoming(&value).is_ok());
    }

    fn shared(country: Country, pm25: f64, timestamp: String) -> A2aMessage {
        let aggregate = CityAggregate {
            city: country.city(),
            country,
            pm25,
            pm25_max: pm25,
            pm25_min: pm25,
            measurement_count: 1,
            timestamp,
            coordinates: Coordinate::new(22.57, 88.36),
        };
        A2aMessage::to_neighbor(
            country,
            MessageType::AirQualityData,
            serde_json::to_value(aggregate).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_simulated_link_counts_messages() {
        let link = SimulatedLink::new(Duration::from_millis(0));
        link.send(A2aMessage::to_neighbor(Country::India, MessageType::PolicyProposal, json!({})))
            .await
            .unwrap();
        assert_eq!(link.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_simulated_link_delivers_to_receiver_once() {
        let link = SimulatedLink::new(Duration::from_millis(0));
        link.send(shared(Country::India, 60.0, Utc::now().to_rfc3339()))
            .await
            .unwrap();

        assert!(link.receive(Country::India).await.unwrap().is_empty());
        let delivered = link.receive(Country::Bangladesh).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].sender_country, Country::India);
        assert!(link.receive(Country::Bangladesh).await.unwrap().is_empty());
    }

    #[test]
    fn test_accept_incoming_checks_payload_and_address() {
        let fresh = shared(Country::India, 60.0, Utc::now().to_rfc3339());
        let aggregate = accept_incoming(&fresh, Country::Bangladesh).unwrap();
        assert_eq!(aggregate.city, City::Kolkata);
        assert_eq!(aggregate.pm25, 60.0);

        assert!(accept_incoming(&fresh, Country::India).is_err());

        let stale = (Utc::now() - ChronoDuration::hours(30)).to_rfc3339();
        assert!(accept_incoming(&shared(Country::India, 60.0, stale), Country::Bangladesh).is_err());
        assert!(accept_incoming(
            &shared(Country::India, 1500.0, Utc::now().to_rfc3339()),
            Country::Bangladesh
        )
        .is_err());

        let proposal = A2aMessage::to_neighbor(
            Country::India,
            MessageType::PolicyProposal,
            fresh.payload.clone(),
        );
        assert!(accept_incoming(&proposal, Country::Bangladesh).is_err());
    }
}
