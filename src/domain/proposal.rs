use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::country::Country;
use super::policy::PolicyAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Proposed,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalResponse {
    Accept,
    Reject,
    Modify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    BilateralEmergencyResponse,
    TransboundaryNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub response: ProposalResponse,
    pub comments: String,
    pub timestamp: DateTime<Utc>,
}

/// Action payload, shaped by the kind of proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalDetails {
    Bilateral {
        dhaka_pm25: f64,
        kolkata_pm25: f64,
        dhaka_actions: Vec<PolicyAction>,
        kolkata_actions: Vec<PolicyAction>,
        implementation_time: DateTime<Utc>,
        duration_hours: u32,
    },
    Notification {
        source_country: Country,
        pm25_level: f64,
        transboundary_contribution_percent: f64,
        requested_actions: Vec<String>,
        duration_hours: u32,
    },
}

/// Cross-border proposal, finalised once both countries have answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationProposal {
    pub proposal_id: String,
    pub proposing_country: Country,
    pub action_type: ActionType,
    pub details: ProposalDetails,
    pub responses: BTreeMap<Country, ResponseRecord>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl CoordinationProposal {
    pub fn is_final(&self) -> bool {
        self.status != ProposalStatus::Proposed
    }

    pub fn participating_countries(&self) -> Vec<Country> {
        vec![self.proposing_country, self.proposing_country.neighbor()]
    }
}
