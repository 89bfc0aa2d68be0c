//! Categorized workflow errors.
//!
//! Every abort carries a numeric code. The leading digit is the [`Severity`] class,
//! so callers can route on the class without matching individual variants.

use super::{Bandwidth, DeviceRole, Mismatch, RevisionState};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// SEVERITY
// =============================================================================

/// Severity class encoded in the leading digit of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 1xxx: non-fatal note.
    Informational,
    /// 2xxx: API or network failure that may succeed on a later attempt.
    Recoverable,
    /// 3xxx: the request itself is wrong.
    UserInput,
    /// 4xxx: a license, port or other resource is missing.
    MissingResource,
    /// 5xxx: inventory data is inconsistent or a business rule forbids the change.
    Logical,
}

impl Severity {
    /// Classify a code by its leading digit.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code / 1000 {
            1 => Some(Self::Informational),
            2 => Some(Self::Recoverable),
            3 => Some(Self::UserInput),
            4 => Some(Self::MissingResource),
            5 => Some(Self::Logical),
            _ => None,
        }
    }

    /// The leading digit for this class.
    #[must_use]
    pub const fn leading_digit(self) -> u16 {
        match self {
            Self::Informational => 1,
            Self::Recoverable => 2,
            Self::UserInput => 3,
            Self::MissingResource => 4,
            Self::Logical => 5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Informational => "informational",
            Self::Recoverable => "recoverable",
            Self::UserInput => "user input",
            Self::MissingResource => "missing resource",
            Self::Logical => "logical",
        };
        f.write_str(label)
    }
}

// =============================================================================
// PATHWISE ERROR
// =============================================================================

/// Error type for every fallible pathwise operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathwiseError {
    // ---- 2xxx: recoverable API / network ----
    /// The inventory could not be reached or answered with a transport failure.
    #[error("Inventory call '{operation}' failed: {detail}")]
    Inventory { operation: String, detail: String },

    /// A required device did not answer a control-plane command.
    #[error("Device communication: {command} on {tid}: {detail}")]
    DeviceCommunication {
        tid: String,
        command: String,
        detail: String,
    },

    /// A bounded poll ran out of attempts.
    #[error("Timed out waiting for {what} after {attempts} attempts")]
    PollTimeout { what: String, attempts: u32 },

    /// The blacklist or ticketing service failed.
    #[error("Compliance service {service} failed: {detail}")]
    ComplianceService { service: String, detail: String },

    // ---- 3xxx: user / input ----
    /// The product is not handled by this workflow.
    #[error("Unsupported product: {0}")]
    UnsupportedProduct(String),

    /// Requested and current bandwidth are equal.
    #[error("No change required: requested bandwidth {0} matches current bandwidth")]
    BandwidthUnchanged(Bandwidth),

    /// Requested bandwidth is below the current bandwidth.
    #[error("Requested bandwidth {requested} is less than current bandwidth {current}")]
    BandwidthDowngrade {
        requested: Bandwidth,
        current: Bandwidth,
    },

    /// A bandwidth string could not be parsed.
    #[error("Invalid bandwidth: {0}")]
    InvalidBandwidth(String),

    /// The request combines options the workflow does not support.
    #[error("Unsupported request: {0}")]
    RestrictedCombination(String),

    /// The CRM order and the inventory disagree on a field.
    #[error("{field} mismatch: order has '{ordered}', inventory has '{recorded}'")]
    CrossSystemMismatch {
        field: String,
        ordered: String,
        recorded: String,
    },

    /// Malformed input file or payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ---- 4xxx: missing resource ----
    /// The inventory holds no record for the lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No spare port of the required rate on a device.
    #[error("No available {rate} port on {tid}")]
    NoAvailablePort { tid: String, rate: String },

    /// No adapter is registered for the device's vendor and model.
    #[error("Unsupported vendor {vendor} model {model}")]
    UnsupportedVendor { vendor: String, model: String },

    // ---- 5xxx: logical / data ----
    /// The circuit uses a topology the engine cannot reconcile.
    #[error("Unsupported topology: {0}")]
    UnsupportedTopology(String),

    /// A mandatory device role is absent from the circuit.
    #[error("Circuit has no {0} device")]
    MissingDevice(DeviceRole),

    /// The same device port is used by two distinct links.
    #[error("Port {port} on {tid} appears in more than one link")]
    MultiplyLinkedPort { tid: String, port: String },

    /// The transport links form a cycle.
    #[error("Transport links loop back through {0}")]
    TopologyLoop(String),

    /// The inventory handed out an instance id that is not new.
    #[error("Revision {instance} of {parent} is not a new instance")]
    RevisionConflict { parent: String, instance: String },

    /// Network configuration disagrees with the inventory.
    #[error("Reconciliation failed with {} mismatch(es): {}", .0.len(), summarize(.0))]
    ReconciliationFailed(Vec<Mismatch>),

    /// A capacity or physical-layer rule rejects the change.
    #[error("Ineligible: {0}")]
    Ineligible(String),

    /// Insufficient capacity on a hub-to-hub transport.
    #[error("Hub transport path upgrades are unsupported: {0}")]
    HubTransportUnsupported(String),

    /// A record is missing mandatory data or contradicts another record.
    #[error("Inconsistent inventory record: {0}")]
    InconsistentRecord(String),

    /// A revision operation was attempted from the wrong state.
    #[error("Cannot {action} a revision in state {from:?}")]
    InvalidRevisionTransition {
        from: RevisionState,
        action: &'static str,
    },
}

fn summarize(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PathwiseError {
    /// Numeric code; the leading digit is the severity class.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Inventory { .. } => 2001,
            Self::DeviceCommunication { .. } => 2002,
            Self::PollTimeout { .. } => 2003,
            Self::ComplianceService { .. } => 2004,
            Self::UnsupportedProduct(_) => 3001,
            Self::BandwidthUnchanged(_) => 3002,
            Self::BandwidthDowngrade { .. } => 3003,
            Self::InvalidBandwidth(_) => 3004,
            Self::RestrictedCombination(_) => 3005,
            Self::CrossSystemMismatch { .. } => 3006,
            Self::InvalidInput(_) => 3007,
            Self::NotFound(_) => 4001,
            Self::NoAvailablePort { .. } => 4002,
            Self::UnsupportedVendor { .. } => 4003,
            Self::UnsupportedTopology(_) => 5001,
            Self::MissingDevice(_) => 5002,
            Self::MultiplyLinkedPort { .. } => 5003,
            Self::TopologyLoop(_) => 5004,
            Self::RevisionConflict { .. } => 5005,
            Self::ReconciliationFailed(_) => 5006,
            Self::Ineligible(_) => 5007,
            Self::HubTransportUnsupported(_) => 5008,
            Self::InconsistentRecord(_) => 5009,
            Self::InvalidRevisionTransition { .. } => 5010,
        }
    }

    /// Severity class of [`code`](Self::code).
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match Severity::from_code(self.code()) {
            Some(severity) => severity,
            None => Severity::Logical,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
