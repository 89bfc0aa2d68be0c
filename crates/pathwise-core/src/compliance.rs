//! # Eligibility & Compliance Gate
//!
//! Screens a circuit's public IPv4 resources against the blacklist service before a
//! mutation is committed, and records the product's access policy once it is.
//!
//! Screening order is gateway, assigned subnet, glue subnet. The first listed
//! resource decides. RFC 1918 addresses never leave the engine. A hit opens a
//! tracking ticket; a ticket failure is logged and changes nothing.

use crate::config::EngineConfig;
use crate::graph::CircuitRecord;
use crate::inventory::{InventoryStore, PolicyAssignment};
use crate::PathwiseError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use thiserror::Error;

// =============================================================================
// SERVICE SEAMS
// =============================================================================

/// Answer of the blacklist service for one address or subnet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlacklistStatus {
    pub listed: bool,
    /// Listed addresses within the queried resource.
    pub ips: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service}: {detail}")]
pub struct ComplianceError {
    pub service: &'static str,
    pub detail: String,
}

impl From<ComplianceError> for PathwiseError {
    fn from(err: ComplianceError) -> Self {
        Self::ComplianceService {
            service: err.service.to_string(),
            detail: err.detail,
        }
    }
}

pub trait BlacklistService {
    fn is_blacklisted(&self, resource: &str) -> Result<BlacklistStatus, ComplianceError>;
}

pub trait TicketingService {
    /// Open a tracking ticket and return its id.
    fn open_ticket(&self, summary: &str, detail: &str) -> Result<String, ComplianceError>;
}

// =============================================================================
// IN-MEMORY SERVICES
// =============================================================================

/// Blacklist with a fixed set of listed resources. Queries are journaled.
#[derive(Debug, Default)]
pub struct StaticBlacklist {
    listed: BTreeSet<String>,
    reason: Option<String>,
    failing: bool,
    queries: RefCell<Vec<String>>,
}

impl StaticBlacklist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn listing(mut self, resource: &str) -> Self {
        self.listed.insert(resource.trim().to_string());
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    /// Make every query fail.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl BlacklistService for StaticBlacklist {
    fn is_blacklisted(&self, resource: &str) -> Result<BlacklistStatus, ComplianceError> {
        self.queries.borrow_mut().push(resource.to_string());
        if self.failing {
            return Err(ComplianceError {
                service: "blacklist",
                detail: "injected failure".into(),
            });
        }
        let listed = self.listed.contains(resource.trim());
        Ok(BlacklistStatus {
            listed,
            ips: if listed { vec![resource.to_string()] } else { Vec::new() },
            reason: if listed { self.reason.clone() } else { None },
        })
    }
}

/// Ticketing service that hands out sequential ids and keeps every summary.
#[derive(Debug, Default)]
pub struct RecordingTicketing {
    failing: bool,
    opened: RefCell<Vec<String>>,
}

impl RecordingTicketing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Summaries of the tickets opened so far.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl TicketingService for RecordingTicketing {
    fn open_ticket(&self, summary: &str, _detail: &str) -> Result<String, ComplianceError> {
        if self.failing {
            return Err(ComplianceError {
                service: "ticketing",
                detail: "injected failure".into(),
            });
        }
        let mut opened = self.opened.borrow_mut();
        opened.push(summary.to_string());
        Ok(format!("TKT-{}", opened.len()))
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Result of screening one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplianceDecision {
    pub blacklisted: bool,
    /// Resources sent to the blacklist service, in order.
    pub screened: Vec<String>,
    /// The resource that was found listed.
    pub hit: Option<String>,
    pub reason: Option<String>,
    pub ticket_id: Option<String>,
}

pub struct ComplianceGate<'a> {
    blacklist: &'a dyn BlacklistService,
    ticketing: &'a dyn TicketingService,
    inventory: &'a dyn InventoryStore,
    config: &'a EngineConfig,
}

/// The address, or the network address of a CIDR subnet, is RFC 1918.
fn is_private(resource: &str) -> bool {
    let address = resource.split('/').next().unwrap_or_default().trim();
    address
        .parse::<Ipv4Addr>()
        .is_ok_and(|ip| ip.is_private())
}

impl<'a> ComplianceGate<'a> {
    pub fn new(
        blacklist: &'a dyn BlacklistService,
        ticketing: &'a dyn TicketingService,
        inventory: &'a dyn InventoryStore,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            blacklist,
            ticketing,
            inventory,
            config,
        }
    }

    /// Screen the circuit's public IPv4 resources.
    ///
    /// # Errors
    /// `ComplianceService` when the blacklist service cannot answer.
    pub fn screen(&self, circuit: &CircuitRecord) -> Result<ComplianceDecision, PathwiseError> {
        let candidates = [
            circuit.ipv4_gateway.as_deref(),
            circuit.ipv4_assigned_subnet.as_deref(),
            circuit.ipv4_glue_subnet.as_deref(),
        ];

        let mut decision = ComplianceDecision::default();
        for resource in candidates.into_iter().flatten().map(str::trim) {
            if resource.is_empty() {
                continue;
            }
            if is_private(resource) {
                tracing::debug!(circuit = %circuit.circuit_id, resource, "private address not screened");
                continue;
            }
            decision.screened.push(resource.to_string());
            let status = self.blacklist.is_blacklisted(resource)?;
            if status.listed {
                decision.blacklisted = true;
                decision.hit = Some(resource.to_string());
                decision.reason = status.reason;
                break;
            }
        }

        if let Some(hit) = decision.hit.as_deref() {
            let summary = format!("Blacklisted resource {hit} on {}", circuit.circuit_id);
            let detail = decision.reason.clone().unwrap_or_default();
            match self.ticketing.open_ticket(&summary, &detail) {
                Ok(id) => decision.ticket_id = Some(id),
                Err(err) => tracing::warn!(circuit = %circuit.circuit_id, "ticket not opened: {}", err),
            }
        }

        tracing::info!(
            circuit = %circuit.circuit_id,
            screened = decision.screened.len(),
            blacklisted = decision.blacklisted,
            "compliance screen"
        );
        Ok(decision)
    }

    /// Record the product's access policy on a committed revision.
    ///
    /// Returns the assignment, or `None` for products without a policy.
    pub fn assign_policy(
        &self,
        circuit_id: &str,
        instance_id: &str,
        product: &str,
    ) -> Result<Option<PolicyAssignment>, PathwiseError> {
        let Some(policy) = self
            .config
            .product_policies
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(product.trim()))
            .map(|(_, policy)| policy.clone())
        else {
            tracing::debug!(circuit = circuit_id, product, "no access policy for product");
            return Ok(None);
        };

        let assignment = PolicyAssignment {
            circuit_id: circuit_id.to_string(),
            instance_id: instance_id.to_string(),
            product: product.trim().to_string(),
            class_of_service: Some(policy),
        };
        self.inventory.assign_policy(&assignment)?;
        Ok(Some(assignment))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InMemoryInventory, Mutation};

    const CID: &str = "51.L1XX.004512..CHTR";

    fn circuit() -> CircuitRecord {
        CircuitRecord {
            circuit_id: CID.into(),
            ipv4_gateway: Some("71.42.10.1".into()),
            ipv4_assigned_subnet: Some("71.42.10.0/29".into()),
            ipv4_glue_subnet: Some("10.20.0.0/30".into()),
            ..CircuitRecord::default()
        }
    }

    #[test]
    fn clean_circuit_screens_public_resources_in_order() {
        let (blacklist, ticketing) = (StaticBlacklist::new(), RecordingTicketing::new());
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);

        let decision = gate.screen(&circuit()).expect("screened");
        assert!(!decision.blacklisted);
        assert_eq!(decision.screened, vec!["71.42.10.1", "71.42.10.0/29"]);
        assert_eq!(blacklist.queries(), decision.screened);
        assert!(ticketing.opened().is_empty());
    }

    #[test]
    fn first_hit_wins_and_opens_ticket() {
        let blacklist = StaticBlacklist::new()
            .listing("71.42.10.1")
            .listing("71.42.10.0/29")
            .with_reason("spam source");
        let ticketing = RecordingTicketing::new();
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);

        let decision = gate.screen(&circuit()).expect("screened");
        assert!(decision.blacklisted);
        assert_eq!(decision.hit.as_deref(), Some("71.42.10.1"));
        assert_eq!(decision.reason.as_deref(), Some("spam source"));
        assert_eq!(decision.ticket_id.as_deref(), Some("TKT-1"));
        assert_eq!(blacklist.queries().len(), 1);
    }

    #[test]
    fn ticket_failure_keeps_decision() {
        let blacklist = StaticBlacklist::new().listing("71.42.10.0/29");
        let ticketing = RecordingTicketing::new().failing();
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);

        let decision = gate.screen(&circuit()).expect("screened");
        assert!(decision.blacklisted);
        assert_eq!(decision.hit.as_deref(), Some("71.42.10.0/29"));
        assert_eq!(decision.ticket_id, None);
    }

    #[test]
    fn blacklist_outage_is_recoverable_error() {
        let (blacklist, ticketing) = (StaticBlacklist::new().failing(), RecordingTicketing::new());
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);

        let err = gate.screen(&circuit()).expect_err("outage");
        assert_eq!(err.code(), 2004);
    }

    #[test]
    fn private_only_circuit_sends_nothing() {
        let (blacklist, ticketing) = (StaticBlacklist::new(), RecordingTicketing::new());
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);
        let record = CircuitRecord {
            circuit_id: CID.into(),
            ipv4_gateway: Some("192.168.1.1".into()),
            ipv4_assigned_subnet: Some("172.16.4.0/24".into()),
            ..CircuitRecord::default()
        };

        let decision = gate.screen(&record).expect("screened");
        assert!(decision.screened.is_empty());
        assert!(blacklist.queries().is_empty());
    }

    #[test]
    fn policy_follows_product_table() {
        let (blacklist, ticketing) = (StaticBlacklist::new(), RecordingTicketing::new());
        let inventory = InMemoryInventory::new();
        let config = EngineConfig::default();
        let gate = ComplianceGate::new(&blacklist, &ticketing, &inventory, &config);

        let assignment = gate
            .assign_policy(CID, "101", "fiber internet access")
            .expect("assigned")
            .expect("policy");
        assert_eq!(assignment.class_of_service.as_deref(), Some("GSIP"));
        assert_eq!(inventory.journal(), vec![Mutation::AssignPolicy(assignment)]);

        let none = gate
            .assign_policy(CID, "101", "Wireless Internet Access")
            .expect("no policy");
        assert_eq!(none, None);
        assert_eq!(inventory.journal().len(), 1);
    }
}
