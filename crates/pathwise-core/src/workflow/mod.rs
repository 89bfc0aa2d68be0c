//! # Workflows
//!
//! The two request-level pipelines built from the engine's components:
//!
//! - [`upgrade`]: bandwidth upgrade of an in-service circuit, with transport and CPE
//!   swaps when the current equipment cannot carry the new rate
//! - [`disconnect`]: full or partial disconnect classification
//!
//! Every step is a hard gate. A workflow returns either a complete
//! [`WorkflowOutcome`] or a single [`PathwiseError`]; nothing partial.

pub mod disconnect;
pub mod upgrade;

pub use disconnect::disconnect;
pub use upgrade::{OrderDetails, UpgradeRequest, upgrade};

use crate::adapter::AdapterRegistry;
use crate::builder::PathGraphBuilder;
use crate::capacity::CapacityPlanner;
use crate::compliance::{BlacklistService, ComplianceDecision, ComplianceGate, TicketingService};
use crate::config::EngineConfig;
use crate::control_plane::DeviceControlPlane;
use crate::diagnostics::Diagnostics;
use crate::graph::PathGraph;
use crate::inventory::{ElementQuery, InventoryStore};
use crate::poll::Sleeper;
use crate::reconcile::ReconciliationEngine;
use crate::{Bandwidth, PathwiseError, ReconciliationVerdict};
use serde::{Deserialize, Serialize};

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Everything a workflow talks to. Borrowed for the duration of one request.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub inventory: &'a dyn InventoryStore,
    pub control_plane: &'a dyn DeviceControlPlane,
    pub registry: &'a AdapterRegistry,
    pub blacklist: &'a dyn BlacklistService,
    pub ticketing: &'a dyn TicketingService,
    pub sleeper: &'a dyn Sleeper,
    pub config: &'a EngineConfig,
}

impl<'a> Collaborators<'a> {
    fn engine(&self) -> ReconciliationEngine<'a> {
        ReconciliationEngine::new(
            self.registry,
            self.control_plane,
            self.inventory,
            self.config,
            self.sleeper,
        )
    }

    fn planner(&self) -> CapacityPlanner<'a> {
        CapacityPlanner::new(self.inventory, self.control_plane, self.registry, self.config)
    }

    fn gate(&self) -> ComplianceGate<'a> {
        ComplianceGate::new(self.blacklist, self.ticketing, self.inventory, self.config)
    }

    /// Load every element of the circuit and build its graph.
    fn load_graph(&self, circuit_id: &str) -> Result<PathGraph, PathwiseError> {
        let elements = self.inventory.path_elements(&ElementQuery::circuit(circuit_id))?;
        PathGraphBuilder::build(circuit_id, &elements)
    }

    /// Reconcile the graph's devices. A failing verdict aborts the workflow.
    fn reconcile(
        &self,
        graph: &PathGraph,
        skip_cpe_check: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<ReconciliationVerdict, PathwiseError> {
        let verdict = self.engine().reconcile(
            &graph.sor_devices(),
            graph.circuit(),
            skip_cpe_check,
            diagnostics,
        )?;
        if !verdict.passed {
            return Err(PathwiseError::ReconciliationFailed(verdict.mismatches));
        }
        Ok(verdict)
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Kind of bandwidth upgrade that was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeClass {
    /// Existing transport and handoff carry the new rate.
    InPlace,
    /// A 1G transport leg is replaced by a 10G one and the handoff device is
    /// swapped for a 10G shelf.
    TransportUpgradeWithCpeSwap,
}

/// Engineering job a request turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineeringJob {
    FullDisconnect,
    PartialDisconnect,
    Upgrade(UpgradeClass),
}

/// Complete result of a successful workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub verdict: ReconciliationVerdict,
    pub job: EngineeringJob,
    pub hub_work_required: bool,
    pub cpe_installer_needed: bool,
    pub maintenance_window: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceDecision>,
    /// Instance id of the committed circuit revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_instance_id: Option<String>,
    /// Circuit bandwidth once the job is done.
    pub bandwidth: Bandwidth,
}
