//! Cross-border coordination layer
//!
//! - A2A exchange with the neighbouring national agent
//! - Joint policy proposals decided by simple majority
//! - Alert construction and multi-channel distribution

pub mod alerts;
pub mod exchange;
pub mod proposal;

pub use alerts::{
    alarm_fraction, city_alert, transboundary_alert, transboundary_trigger, AlertChannel,
    AlertDispatcher, Channel, DispatchReport, SimulatedChannel, CITY_ALERT_CHANNELS,
    TRANSBOUNDARY_ALERT_CHANNELS,
};
pub use exchange::{
    accept_incoming, agent_id, validate_incoming, validate_incoming_at, A2aMessage,
    CityAggregate, CountryLink, MessagePriority, MessageType, SimulatedLink, PROTOCOL_VERSION,
};
pub use proposal::ProposalBook;

#[cfg(test)]
pub use alerts::MockAlertChannel;
#[cfg(test)]
pub use exchange::MockCountryLink;
