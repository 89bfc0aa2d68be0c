//! # pathwise-core
//!
//! The deterministic circuit engine for Pathwise.
//!
//! Given a circuit identifier, the engine reconstructs the circuit's topology from
//! the inventory's element listing, reconciles it against what the devices on the
//! network actually report, and plans bandwidth upgrades and disconnects as
//! revisions of the inventory records.
//!
//! ## Pipeline
//!
//! ```text
//! inventory elements -> builder -> PathGraph -> reconcile (adapters) -> capacity
//!                    -> revision -> compliance -> commit or abort
//! ```
//!
//! ## Architectural Constraints
//!
//! - Synchronous: no async, no network code. Inventory, devices, blacklist and
//!   ticketing are traits the caller implements
//! - Deterministic: `BTreeMap`/`BTreeSet` only, integer arithmetic only
//! - One circuit per call; devices are queried one at a time
//! - Every abort is a single [`PathwiseError`] with a severity-coded number

// =============================================================================
// MODULES
// =============================================================================

pub mod adapter;
pub mod builder;
pub mod capacity;
pub mod compliance;
pub mod config;
pub mod control_plane;
pub mod diagnostics;
pub mod graph;
pub mod inventory;
pub mod poll;
pub mod primitives;
pub mod reconcile;
pub mod revision;
pub mod role;
pub mod types;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Bandwidth, Device, DeviceRole, ElementType, EligibilityDecision, Level, Mismatch,
    MismatchField, PathElement, PathwiseError, ReconciliationVerdict, RevisionState, Severity,
    Tid, TransportPath, Vendor,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use adapter::{AdapterRegistry, VendorDeviceAdapter};
pub use builder::PathGraphBuilder;
pub use capacity::CapacityPlanner;
pub use compliance::{BlacklistService, ComplianceGate, TicketingService};
pub use config::EngineConfig;
pub use control_plane::DeviceControlPlane;
pub use diagnostics::Diagnostics;
pub use graph::{CircuitRecord, PathGraph};
pub use inventory::InventoryStore;
pub use reconcile::ReconciliationEngine;
pub use revision::{Revision, RevisionLedger};
pub use role::RoleClassifier;
pub use workflow::{Collaborators, EngineeringJob, UpgradeClass, WorkflowOutcome};
