//! Joint policy proposals
//!
//! A proposal is open until both countries have answered, then finalised by
//! simple majority: approved when at least half of the responses accept.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::exchange::{A2aMessage, CountryLink, MessagePriority, MessageType};
use crate::domain::{
    ActionType, CoordinationProposal, Country, ProposalDetails, ProposalResponse, ProposalStatus,
    ResponseRecord,
};
use crate::error::{AqmsError, Result};

pub struct ProposalBook {
    proposals: HashMap<String, CoordinationProposal>,
    link: Arc<dyn CountryLink>,
}

impl ProposalBook {
    pub fn new(link: Arc<dyn CountryLink>) -> Self {
        Self {
            proposals: HashMap::new(),
            link,
        }
    }

    /// Open a proposal and notify the neighbour.
    ///
    /// The proposer's own acceptance is recorded immediately. A failed
    /// notification is logged; the proposal stays open.
    pub async fn propose(
        &mut self,
        proposing_country: Country,
        action_type: ActionType,
        details: ProposalDetails,
    ) -> Result<String> {
        let now = Utc::now();
        let proposal_id = format!("policy_{}", Uuid::new_v4());

        let mut responses = BTreeMap::new();
        responses.insert(
            proposing_country,
            ResponseRecord {
                response: ProposalResponse::Accept,
                comments: "proposer".to_string(),
                timestamp: now,
            },
        );

        let proposal = CoordinationProposal {
            proposal_id: proposal_id.clone(),
            proposing_country,
            action_type,
            details,
            responses,
            status: ProposalStatus::Proposed,
            created_at: now,
        };

        let message = A2aMessage::to_neighbor(
            proposing_country,
            MessageType::PolicyProposal,
            serde_json::to_value(&proposal)?,
        )
        .with_priority(MessagePriority::High);

        if let Err(e) = self.link.send(message).await {
            warn!(proposal_id = %proposal_id, error = %e, "Failed to notify neighbour of proposal");
        }

        info!(
            proposal_id = %proposal_id,
            proposer = %proposing_country,
            action = ?action_type,
            "Proposal opened"
        );
        self.proposals.insert(proposal_id.clone(), proposal);
        Ok(proposal_id)
    }

    /// Record `country`'s answer and finalise once both sides have answered
    pub fn respond(
        &mut self,
        proposal_id: &str,
        country: Country,
        response: ProposalResponse,
        comments: impl Into<String>,
    ) -> Result<ProposalStatus> {
        let proposal = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| AqmsError::ProposalNotFound(proposal_id.to_string()))?;

        if proposal.is_final() {
            debug!(proposal_id, status = ?proposal.status, "Response to finalised proposal ignored");
            return Ok(proposal.status);
        }

        proposal.responses.insert(
            country,
            ResponseRecord {
                response,
                comments: comments.into(),
                timestamp: Utc::now(),
            },
        );

        let all_answered = proposal
            .participating_countries()
            .iter()
            .all(|c| proposal.responses.contains_key(c));
        if all_answered {
            proposal.status = majority_outcome(&proposal.responses);
            info!(proposal_id, status = ?proposal.status, "Proposal finalised");
        }

        Ok(proposal.status)
    }

    pub fn get(&self, proposal_id: &str) -> Option<&CoordinationProposal> {
        self.proposals.get(proposal_id)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.proposals.values().filter(|p| !p.is_final()).count()
    }
}

fn majority_outcome(responses: &BTreeMap<Country, ResponseRecord>) -> ProposalStatus {
    let accepts = responses
        .values()
        .filter(|r| r.response == ProposalResponse::Accept)
        .count();
    if accepts * 2 >= responses.len() {
        ProposalStatus::Approved
    } else {
        ProposalStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::exchange::MockCountryLink;

    fn notification() -> ProposalDetails {
        ProposalDetails::Notification {
            source_country: Country::Bangladesh,
            pm25_level: 180.0,
            transboundary_contribution_percent: 62.0,
            requested_actions: vec!["industrial_emission_reduction".to_string()],
            duration_hours: 24,
        }
    }

    fn ok_link() -> Arc<dyn CountryLink> {
        let mut link = MockCountryLink::new();
        link.expect_send().returning(|_| Ok(()));
        Arc::new(link)
    }

    #[tokio::test]
    async fn test_propose_notifies_neighbor() {
        let mut link = MockCountryLink::new();
        link.expect_send()
            .withf(|m| {
                m.receiver_country == Country::India
                    && m.message_type == MessageType::PolicyProposal
                    && m.priority == MessagePriority::High
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut book = ProposalBook::new(Arc::new(link));
        let id = book
            .propose(Country::Bangladesh, ActionType::TransboundaryNotification, notification())
            .await
            .unwrap();

        let proposal = book.get(&id).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Proposed);
        assert_eq!(proposal.responses.len(), 1);
        assert_eq!(book.open_count(), 1);
    }

    #[tokio::test]
    async fn test_acceptance_approves() {
        let mut book = ProposalBook::new(ok_link());
        let id = book
            .propose(Country::Bangladesh, ActionType::TransboundaryNotification, notification())
            .await
            .unwrap();

        let status = book
            .respond(&id, Country::India, ProposalResponse::Accept, "agreed")
            .unwrap();
        assert_eq!(status, ProposalStatus::Approved);
        assert_eq!(book.open_count(), 0);
    }

    #[tokio::test]
    async fn test_split_vote_counts_as_majority() {
        let mut book = ProposalBook::new(ok_link());
        let id = book
            .propose(Country::India, ActionType::TransboundaryNotification, notification())
            .await
            .unwrap();
        let status = book
            .respond(&id, Country::Bangladesh, ProposalResponse::Reject, "")
            .unwrap();
        assert_eq!(status, ProposalStatus::Approved);
    }

    #[test]
    fn test_all_rejects_reject() {
        let now = Utc::now();
        let mut responses = BTreeMap::new();
        for country in Country::ALL {
            responses.insert(
                country,
                ResponseRecord {
                    response: ProposalResponse::Reject,
                    comments: String::new(),
                    timestamp: now,
                },
            );
        }
        assert_eq!(majority_outcome(&responses), ProposalStatus::Rejected);
    }

    #[tokio::test]
    async fn test_link_failure_keeps_proposal() {
        let mut link = MockCountryLink::new();
        link.expect_send().returning(|m| {
            Err(AqmsError::Link {
                target: m.receiver_country,
                reason: "unreachable".to_string(),
            })
        });
        let mut book = ProposalBook::new(Arc::new(link));
        let id = book
            .propose(Country::Bangladesh, ActionType::TransboundaryNotification, notification())
            .await
            .unwrap();
        assert!(book.get(&id).is_some());
    }

    #[test]
    fn test_unknown_proposal() {
        let mut book = ProposalBook::new(ok_link());
        let err = book
            .respond("missing", Country::India, ProposalResponse::Accept, "")
            .unwrap_err();
        assert!(matches!(err, AqmsError::ProposalNotFound(_)));
    }
}
