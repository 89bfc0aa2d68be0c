//! # Inventory System of Record
//!
//! The seam between the engine and the inventory (SoR).
//!
//! The engine only ever reads path/element records and writes revisions. Every
//! call goes through [`InventoryStore`], so the transport (HTTP client, retry wrapper,
//! credentials) stays outside this crate. [`decode_records`] is the shared response
//! decoder: the inventory answers an empty lookup with a "no records" message instead
//! of an empty list, and that must surface as `NotFound`, never as a transport error.

mod memory;

pub use memory::{InMemoryInventory, Mutation};

use crate::primitives::NO_RECORDS_SENTINEL;
use crate::{Bandwidth, Level, PathElement, PathwiseError, Tid};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a single inventory call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The inventory answered but holds no matching record.
    #[error("no records for {0}")]
    NotFound(String),

    /// The call itself failed.
    #[error("{operation}: {detail}")]
    Transport { operation: String, detail: String },

    /// The answer could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<InventoryError> for PathwiseError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(what) => Self::NotFound(what),
            InventoryError::Transport { operation, detail } => Self::Inventory { operation, detail },
            InventoryError::Malformed(detail) => Self::InconsistentRecord(detail),
        }
    }
}

/// Decode a JSON response body into records.
///
/// - An array decodes element by element.
/// - A single object decodes as one record, unless it carries the "no records" message.
/// - Any string or object mentioning the "no records" message is `NotFound(context)`.
pub fn decode_records<T: DeserializeOwned>(
    context: &str,
    body: Value,
) -> Result<Vec<T>, InventoryError> {
    if mentions_no_records(&body) {
        return Err(InventoryError::NotFound(context.to_string()));
    }
    let malformed = |e: serde_json::Error| InventoryError::Malformed(format!("{context}: {e}"));
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(malformed))
            .collect(),
        Value::Object(_) => Ok(vec![serde_json::from_value(body).map_err(malformed)?]),
        Value::Null => Err(InventoryError::NotFound(context.to_string())),
        other => Err(InventoryError::Malformed(format!(
            "{context}: unexpected response {other}"
        ))),
    }
}

fn mentions_no_records(body: &Value) -> bool {
    match body {
        Value::String(s) => s.contains(NO_RECORDS_SENTINEL),
        Value::Object(map) => ["retString", "message"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .any(|s| s.contains(NO_RECORDS_SENTINEL)),
        _ => false,
    }
}

/// Numeric columns arrive as numbers, numeric strings or null.
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("not an unsigned integer: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("unexpected value {other}"))),
    }
}

// =============================================================================
// QUERIES AND RECORDS
// =============================================================================

/// What a path-element listing is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElementKey {
    Circuit(String),
    Instance(String),
}

/// A path-element lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ElementQuery {
    pub key: ElementKey,
    pub level: Option<Level>,
}

impl ElementQuery {
    #[must_use]
    pub fn circuit(circuit_id: impl Into<String>) -> Self {
        Self {
            key: ElementKey::Circuit(circuit_id.into()),
            level: None,
        }
    }

    #[must_use]
    pub fn instance(instance_id: impl Into<String>, level: Level) -> Self {
        Self {
            key: ElementKey::Instance(instance_id.into()),
            level: Some(level),
        }
    }

    /// Stable textual form, used for logging and fixture keys.
    #[must_use]
    pub fn describe(&self) -> String {
        let (kind, id) = match &self.key {
            ElementKey::Circuit(id) => ("circuit", id),
            ElementKey::Instance(id) => ("instance", id),
        };
        let level = self.level.map_or_else(|| "*".to_string(), |l| u8::from(l).to_string());
        format!("{kind}:{id}:{level}")
    }
}

/// Utilization row for a transport path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PathUtilization {
    pub path_name: Option<String>,
    /// "AGGREGATE" for shared aggregate paths, otherwise the nominal rate.
    pub bandwidth: Option<String>,
    #[serde(rename = "TOTAL_BW", deserialize_with = "lenient_u64")]
    pub total_bps: Option<u64>,
    #[serde(rename = "USED_BW", deserialize_with = "lenient_u64")]
    pub used_bps: Option<u64>,
    #[serde(rename = "AVAILABLE_BW", deserialize_with = "lenient_u64")]
    pub available_bps: Option<u64>,
    /// Oversubscription already recorded on an aggregate path.
    #[serde(rename = "PATH_MAX_OVER_SUB", deserialize_with = "lenient_u64")]
    pub oversubscription_percent: Option<u64>,
}

impl PathUtilization {
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.bandwidth
            .as_deref()
            .is_some_and(|bw| bw.trim().eq_ignore_ascii_case("AGGREGATE"))
    }

    #[must_use]
    pub fn available(&self) -> Option<Bandwidth> {
        self.available_bps.map(Bandwidth::from_bps)
    }
}

/// An in-use channel on a transport path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ChannelAssignment {
    pub chan_name: Option<String>,
    /// Circuit that owns the channel.
    pub member_path: String,
    /// Next path on the member circuit, and its instance id.
    pub next_path: Option<String>,
    pub next_inst_id: Option<String>,
}

/// A revision of a circuit or transport path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PathRevision {
    pub path_name: String,
    #[serde(rename = "CIRC_PATH_INST_ID")]
    pub instance_id: String,
    pub path_rev: Option<String>,
    pub status: String,
}

impl PathRevision {
    /// Live or designed revisions can be cloned into a new draft.
    #[must_use]
    pub fn is_cloneable(&self) -> bool {
        let status = self.status.to_ascii_uppercase();
        status == "LIVE" || status == "DESIGNED"
    }
}

/// Ids handed back when a revision is created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionReceipt {
    pub path_instance_id: String,
    pub path_id: Option<String>,
}

/// Ids handed back after a path update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathUpdateReceipt {
    pub path_id: Option<String>,
    pub path_instance_id: Option<String>,
}

/// A slot on a piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct EquipmentSlot {
    pub equip_name: String,
    pub slot: Option<String>,
    pub slot_inst_id: String,
    pub port_inst_id: Option<String>,
}

/// A port on a piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct EquipmentPort {
    pub port_inst_id: String,
    pub port_access_id: Option<String>,
    pub slot: Option<String>,
    pub bandwidth: Option<String>,
    pub port_status: Option<String>,
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// A `PUT paths` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathUpdate {
    /// Add a port (or leg) at `sequence` on a revision.
    AddElement {
        path_name: String,
        instance_id: String,
        leg_instance_id: String,
        sequence: String,
        port_instance_id: String,
    },
    /// Remove the element at `sequence` from a revision.
    RemoveElement {
        path_name: String,
        instance_id: String,
        leg_instance_id: String,
        sequence: String,
    },
    /// Set a path's bandwidth, optionally moving it onto a new CPE shelf.
    Bandwidth {
        path_name: String,
        instance_id: String,
        bandwidth: Bandwidth,
        new_shelf: Option<String>,
    },
    /// Set a shared path's maximum oversubscription.
    Oversubscription {
        path_name: String,
        instance_id: String,
        percent: u64,
    },
    Status {
        path_name: String,
        instance_id: String,
        status: String,
    },
}

impl PathUpdate {
    /// Instance id the update is applied to.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        match self {
            Self::AddElement { instance_id, .. }
            | Self::RemoveElement { instance_id, .. }
            | Self::Bandwidth { instance_id, .. }
            | Self::Oversubscription { instance_id, .. }
            | Self::Status { instance_id, .. } => instance_id,
        }
    }

    #[must_use]
    pub fn path_name(&self) -> &str {
        match self {
            Self::AddElement { path_name, .. }
            | Self::RemoveElement { path_name, .. }
            | Self::Bandwidth { path_name, .. }
            | Self::Oversubscription { path_name, .. }
            | Self::Status { path_name, .. } => path_name,
        }
    }

    /// Request body in inventory column names.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::AddElement {
                path_name,
                instance_id,
                leg_instance_id,
                sequence,
                port_instance_id,
            } => json!({
                "PATH_NAME": path_name,
                "PATH_INST_ID": instance_id,
                "LEG_INST_ID_1": leg_instance_id,
                "ADD_ELEMENT": "true",
                "PATH_ELEM_SEQUENCE_1": sequence,
                "PORT_INST_ID_1": port_instance_id,
            }),
            Self::RemoveElement {
                path_name,
                instance_id,
                leg_instance_id,
                sequence,
            } => json!({
                "PATH_NAME": path_name,
                "PATH_INST_ID": instance_id,
                "LEG_INST_ID_1": leg_instance_id,
                "REMOVE_ELEMENT": "true",
                "PATH_ELEM_SEQUENCE_1": sequence,
            }),
            Self::Bandwidth {
                path_name,
                instance_id,
                bandwidth,
                new_shelf,
            } => {
                let mut body = json!({
                    "PATH_NAME": path_name,
                    "PATH_INST_ID": instance_id,
                    "BANDWIDTH": bandwidth.to_string(),
                });
                if let (Some(shelf), Some(map)) = (new_shelf, body.as_object_mut()) {
                    map.insert("NEW_SHELF".into(), Value::String(shelf.clone()));
                }
                body
            }
            Self::Oversubscription {
                path_name,
                instance_id,
                percent,
            } => json!({
                "PATH_NAME": path_name,
                "PATH_INST_ID": instance_id,
                "UDA": { "SERVICE TYPE": { "PATH_MAX_OVER_SUB": percent.to_string() } },
            }),
            Self::Status {
                path_name,
                instance_id,
                status,
            } => json!({
                "PATH_NAME": path_name,
                "PATH_INST_ID": instance_id,
                "PATH_STATUS": status,
            }),
        }
    }
}

/// A `PUT ports` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortUpdate {
    pub port_instance_id: String,
    pub status: String,
    pub access_id: String,
}

/// Submission of a CPE hardware swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpeSwapRequest {
    pub circuit_id: String,
    pub circuit_instance_id: String,
    pub device: Tid,
    pub vendor: String,
    pub model: String,
    /// Upgraded transport path the new CPE lands on.
    pub transport_path: String,
}

/// Access policy recorded against a committed revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAssignment {
    pub circuit_id: String,
    pub instance_id: String,
    pub product: String,
    pub class_of_service: Option<String>,
}

// =============================================================================
// INVENTORY STORE TRAIT
// =============================================================================

/// Calls the engine makes against the system of record.
///
/// Every call is synchronous and bounded by the implementation's own timeout.
/// Implementations return `NotFound` for "no records" answers and `Transport` for
/// everything that never produced an answer.
pub trait InventoryStore {
    /// `GET pathElements`.
    fn path_elements(&self, query: &ElementQuery) -> Result<Vec<PathElement>, InventoryError>;

    /// `GET pathUtilization`.
    fn path_utilization(
        &self,
        path_name: &str,
        instance_id: &str,
    ) -> Result<Vec<PathUtilization>, InventoryError>;

    /// `GET pathChanAvailability` filtered to in-use channels.
    fn channels_in_use(&self, path_name: &str) -> Result<Vec<ChannelAssignment>, InventoryError>;

    /// All revisions of a path.
    fn path_revisions(&self, path_name: &str) -> Result<Vec<PathRevision>, InventoryError>;

    /// Clone `parent_instance_id` into a new draft revision.
    fn create_revision(
        &self,
        path_name: &str,
        parent_instance_id: &str,
    ) -> Result<RevisionReceipt, InventoryError>;

    /// `PUT paths`.
    fn update_path(&self, update: &PathUpdate) -> Result<PathUpdateReceipt, InventoryError>;

    /// `PUT ports`.
    fn update_port(&self, update: &PortUpdate) -> Result<(), InventoryError>;

    /// Slots of `equipment` matching `slot`.
    fn equipment_slots(&self, equipment: &str, slot: &str)
    -> Result<Vec<EquipmentSlot>, InventoryError>;

    /// `DELETE cards`.
    fn delete_card(&self, slot: &EquipmentSlot) -> Result<(), InventoryError>;

    /// `POST cards` with a card template.
    fn insert_card(&self, slot: &EquipmentSlot, template: &str) -> Result<(), InventoryError>;

    /// Unassigned ports of `bandwidth` on a device.
    fn available_ports(
        &self,
        tid: &Tid,
        bandwidth: &str,
    ) -> Result<Vec<EquipmentPort>, InventoryError>;

    /// Circuits riding on any port of a device.
    fn equipment_circuits(&self, tid: &Tid) -> Result<Vec<String>, InventoryError>;

    /// Values of a user-defined attribute on a path instance.
    fn attribute_values(
        &self,
        instance_id: &str,
        attribute: &str,
    ) -> Result<Vec<String>, InventoryError>;

    fn swap_cpe(&self, request: &CpeSwapRequest) -> Result<(), InventoryError>;

    fn assign_policy(&self, assignment: &PolicyAssignment) -> Result<(), InventoryError>;
}

// =============================================================================
// TESTS
// =============================================================================
