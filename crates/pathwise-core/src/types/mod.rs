//! # Core Type Definitions
//!
//! This module contains the data model shared by every pathwise component:
//! - Inventory records (`PathElement`, `Level`, `ElementType`)
//! - Derived topology entities (`Tid`, `DeviceRole`, `Vendor`, `Device`, `TransportPath`)
//! - Decision values (`ReconciliationVerdict`, `Mismatch`, `EligibilityDecision`)
//! - Rates (`Bandwidth`) and errors (`PathwiseError`, `Severity`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`

mod bandwidth;
mod error;

pub use bandwidth::Bandwidth;
pub use error::{PathwiseError, Severity};

use crate::primitives::{
    ELIGIBLE_STATUSES, GENERIC_VENDOR, HUB_SUFFIX, PASSIVE_MUX_MODEL,
    PASSIVE_OPTICAL_CATEGORIES, STANDARD_TID_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// DEVICE IDENTIFIER
// =============================================================================

/// Device identifier (TID) as written in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(String);

impl Tid {
    /// Create a TID, trimming whitespace and normalizing to upper case.
    #[must_use]
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the 11-character form that carries a two-letter role suffix.
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.0.len() == STANDARD_TID_LENGTH
    }

    #[must_use]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ELEMENT RECORDS
// =============================================================================

/// Element level: 1 is physical transport, 2 is the logical service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "LevelRepr", into = "u8")]
pub enum Level {
    #[default]
    Transport,
    Service,
}

/// The inventory sends levels as either numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Number(u8),
    Text(String),
}

impl TryFrom<LevelRepr> for Level {
    type Error = String;

    fn try_from(repr: LevelRepr) -> Result<Self, Self::Error> {
        let n = match repr {
            LevelRepr::Number(n) => n,
            LevelRepr::Text(s) => s.trim().parse().map_err(|_| format!("invalid level '{s}'"))?,
        };
        match n {
            1 => Ok(Self::Transport),
            2 => Ok(Self::Service),
            other => Err(format!("unsupported level {other}")),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        match level {
            Level::Transport => 1,
            Level::Service => 2,
        }
    }
}

/// Kind of hop an element describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ElementType {
    #[serde(rename = "PATH")]
    Path,
    #[serde(rename = "PORT")]
    Port,
    #[serde(rename = "NETWORK")]
    Network,
    #[serde(rename = "NETWORK LINK")]
    NetworkLink,
    #[default]
    #[serde(other, rename = "OTHER")]
    Other,
}

/// One row of an inventory path-element listing.
///
/// Field names follow the inventory's column names. Everything except the path name,
/// level and status may be null.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PathElement {
    #[serde(rename = "LVL")]
    pub level: Level,
    pub path_name: String,
    #[serde(rename = "CIRC_PATH_INST_ID")]
    pub path_instance_id: Option<String>,
    pub element_type: ElementType,
    pub element_category: Option<String>,
    pub element_status: String,
    pub element_name: Option<String>,
    /// Instance id of the child path when `element_type` is `PATH`.
    pub element_reference: Option<String>,
    pub element_bandwidth: Option<String>,
    /// Circuit bandwidth as recorded on the service path.
    pub bandwidth: Option<String>,
    pub tid: Option<String>,
    pub port_access_id: Option<String>,
    pub port_inst_id: Option<String>,
    pub equip_inst_id: Option<String>,
    #[serde(rename = "CHAN_NAME")]
    pub channel: Option<String>,
    pub leg_name: Option<String>,
    pub leg_inst_id: Option<String>,
    pub sequence: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub connector_type: Option<String>,
    /// `DYNAMIC` on channelized (trunked) handoff ports.
    pub port_channelization: Option<String>,
    pub slot: Option<String>,
    pub port_role: Option<String>,
    #[serde(rename = "PATH_Z_SITE_TYPE")]
    pub z_site_type: Option<String>,
    pub z_site_name: Option<String>,
    #[serde(rename = "IPV4_ASSIGNED_SUBNETS")]
    pub ipv4_assigned_subnet: Option<String>,
    #[serde(rename = "IPV4_ASSIGNED_GATEWAY")]
    pub ipv4_gateway: Option<String>,
    pub ipv4_glue_subnet: Option<String>,
    pub ipv4_service_type: Option<String>,
}

impl PathElement {
    /// Device identifier, if the element names one.
    #[must_use]
    pub fn tid(&self) -> Option<Tid> {
        non_empty(self.tid.as_deref()).map(Tid::new)
    }

    #[must_use]
    pub fn category(&self) -> &str {
        self.element_category.as_deref().unwrap_or_default()
    }

    /// Element status is one that takes part in the topology.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        let status = self.element_status.trim().to_ascii_uppercase();
        ELIGIBLE_STATUSES.contains(&status.as_str())
    }

    /// Element sits on a passive optical network.
    #[must_use]
    pub fn is_passive_optical(&self) -> bool {
        let category = self.category().to_ascii_uppercase();
        PASSIVE_OPTICAL_CATEGORIES
            .iter()
            .any(|fragment| category.contains(fragment))
    }

    /// Customer VLAN from a `VLAN<n>` channel name.
    #[must_use]
    pub fn vlan(&self) -> Option<String> {
        let channel = non_empty(self.channel.as_deref())?;
        let upper = channel.to_ascii_uppercase();
        let digits = upper.strip_prefix("VLAN")?.trim();
        (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then(|| digits.to_string())
    }

    #[must_use]
    pub fn port_access_id(&self) -> Option<&str> {
        non_empty(self.port_access_id.as_deref())
    }
}

/// Trimmed, non-empty view of an optional string.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// DEVICES
// =============================================================================

/// Topological role of a device on a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceRole {
    Hub,
    Agg,
    Mux,
    Cpe,
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Hub => "HUB",
            Self::Agg => "AGG",
            Self::Mux => "MUX",
            Self::Cpe => "CPE",
        };
        f.write_str(label)
    }
}

/// Equipment vendor family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Vendor {
    Juniper,
    Cisco,
    Adva,
    Rad,
    Generic,
    #[default]
    Unknown,
    Other(String),
}

impl Vendor {
    /// Classify an inventory vendor string.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        if upper.is_empty() {
            Self::Unknown
        } else if upper.contains("JUNIPER") {
            Self::Juniper
        } else if upper.contains("CISCO") {
            Self::Cisco
        } else if upper.starts_with("ADVA") {
            Self::Adva
        } else if upper == "RAD" || upper.starts_with("RAD ") {
            Self::Rad
        } else if upper == GENERIC_VENDOR {
            Self::Generic
        } else {
            Self::Other(upper)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Juniper => "JUNIPER",
            Self::Cisco => "CISCO",
            Self::Adva => "ADVA",
            Self::Rad => "RAD",
            Self::Generic => GENERIC_VENDOR,
            Self::Unknown => "",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Vendor {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<Vendor> for String {
    fn from(v: Vendor) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device as seen by one side of a reconciliation.
///
/// The same shape is used for the inventory view and the network view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub tid: Tid,
    pub vendor: Vendor,
    pub model: String,
    /// Role for the current pass only.
    pub role: DeviceRole,
    pub port: Option<String>,
    pub vlan_id: Option<String>,
    /// Port description (network view).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Gateway on the inventory side, observed interface address on the network side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    /// Name of the level-1 transport path that carries this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    /// Set on network-view placeholders for devices that could not be queried.
    #[serde(default)]
    pub unreachable: bool,
}

impl Device {
    #[must_use]
    pub fn new(tid: Tid, role: DeviceRole) -> Self {
        Self {
            tid,
            vendor: Vendor::Unknown,
            model: String::new(),
            role,
            port: None,
            vlan_id: None,
            description: None,
            ipv4: None,
            transport: None,
            unreachable: false,
        }
    }

    /// Placeholder equipment the inventory keeps but the network never reports.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.vendor == Vendor::Generic || self.model.to_ascii_uppercase().contains(PASSIVE_MUX_MODEL)
    }
}

// =============================================================================
// TRANSPORT PATHS
// =============================================================================

/// A level-1 transport path carrying one or more circuits.
///
/// Names follow `<id>.<type>.<upstream tid>.<downstream tid>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPath {
    pub path_id: String,
    pub path_instance_id: String,
    pub bandwidth_nominal: Bandwidth,
    pub bandwidth_available: Option<Bandwidth>,
    pub oversubscription_percent: u64,
    pub status: String,
}

impl TransportPath {
    #[must_use]
    pub fn new(path_id: impl Into<String>, path_instance_id: impl Into<String>) -> Self {
        Self {
            path_id: path_id.into(),
            path_instance_id: path_instance_id.into(),
            bandwidth_nominal: Bandwidth::ZERO,
            bandwidth_available: None,
            oversubscription_percent: 0,
            status: String::new(),
        }
    }

    /// Device at the network side of the path (second to last segment).
    #[must_use]
    pub fn upstream_tid(&self) -> Option<Tid> {
        let mut segments = self.path_id.rsplit('.');
        segments.next()?;
        segments.next().map(Tid::new)
    }

    /// Device at the customer side of the path (last segment).
    #[must_use]
    pub fn downstream_tid(&self) -> Option<Tid> {
        self.path_id.rsplit('.').next().map(Tid::new)
    }

    /// The path leaves from a hub router, i.e. it is not a customer-side leg.
    #[must_use]
    pub fn is_hub_segment(&self) -> bool {
        self.upstream_tid()
            .is_some_and(|tid| tid.has_suffix(HUB_SUFFIX))
    }
}

// =============================================================================
// DECISIONS
// =============================================================================

/// Field that failed to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchField {
    Description,
    Vlan,
    Ipv4,
    Missing,
}

/// One disagreement between inventory and network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub tid: String,
    pub field: MismatchField,
    pub expected: String,
    pub observed: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}: expected '{}', observed '{}'",
            self.tid, self.field, self.expected, self.observed
        )
    }
}

/// Result of one reconciliation pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationVerdict {
    pub passed: bool,
    pub sor_view: Vec<Device>,
    pub network_view: Vec<Device>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
}

/// Outcome of a physical-layer eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub eligible: bool,
    pub reason: Option<String>,
    pub device_context: Option<String>,
    /// The change touches hub equipment.
    pub hub_work_required: bool,
}

impl EligibilityDecision {
    #[must_use]
    pub fn eligible(device_context: Option<String>, hub_work_required: bool) -> Self {
        Self {
            eligible: true,
            reason: None,
            device_context,
            hub_work_required,
        }
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>, device_context: Option<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
            device_context,
            hub_work_required: false,
        }
    }
}

// =============================================================================
// REVISIONS
// =============================================================================

/// Lifecycle state of a circuit or transport revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevisionState {
    None,
    Created,
    Mutated,
    Committed,
    RolledBack,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_deserializes_inventory_columns() {
        let json = r#"{
            "LVL": "2",
            "PATH_NAME": "51001.GE1.AUSTTXGR2QW.AUSTTXZB1ZW",
            "CIRC_PATH_INST_ID": "1234",
            "ELEMENT_TYPE": "NETWORK LINK",
            "ELEMENT_STATUS": "Live",
            "TID": " austtxgr2qw ",
            "CHAN_NAME": "VLAN1100",
            "IPV4_ASSIGNED_SUBNETS": null,
            "SOME_NEW_COLUMN": "ignored"
        }"#;
        let element: PathElement = serde_json::from_str(json).expect("valid element");
        assert_eq!(element.level, Level::Service);
        assert_eq!(element.element_type, ElementType::NetworkLink);
        assert_eq!(element.tid(), Some(Tid::new("AUSTTXGR2QW")));
        assert_eq!(element.vlan().as_deref(), Some("1100"));
        assert!(element.is_eligible());
    }

    #[test]
    fn numeric_level_and_unknown_element_type() {
        let json = r#"{"LVL": 1, "PATH_NAME": "x", "ELEMENT_TYPE": "EQUIPMENT", "ELEMENT_STATUS": "PLANNED"}"#;
        let element: PathElement = serde_json::from_str(json).expect("valid element");
        assert_eq!(element.level, Level::Transport);
        assert_eq!(element.element_type, ElementType::Other);
        assert!(!element.is_eligible());
    }

    #[test]
    fn invalid_level_is_rejected() {
        let json = r#"{"LVL": "7", "PATH_NAME": "x", "ELEMENT_STATUS": "LIVE"}"#;
        assert!(serde_json::from_str::<PathElement>(json).is_err());
    }

    #[test]
    fn vlan_requires_numeric_suffix() {
        let mut element = PathElement {
            channel: Some("VLAN".into()),
            ..PathElement::default()
        };
        assert_eq!(element.vlan(), None);
        element.channel = Some("CH-12".into());
        assert_eq!(element.vlan(), None);
    }

    #[test]
    fn passive_optical_category_detected() {
        let element = PathElement {
            element_category: Some("Optical Line Terminal".into()),
            ..PathElement::default()
        };
        assert!(element.is_passive_optical());
    }

    #[test]
    fn vendor_classification() {
        assert_eq!(Vendor::from_name("Juniper Networks"), Vendor::Juniper);
        assert_eq!(Vendor::from_name("ADVA OPTICAL"), Vendor::Adva);
        assert_eq!(Vendor::from_name("rad"), Vendor::Rad);
        assert_eq!(Vendor::from_name("RADWIN"), Vendor::Other("RADWIN".into()));
        assert_eq!(Vendor::from_name(""), Vendor::Unknown);
    }

    #[test]
    fn transport_path_segments() {
        let path = TransportPath::new("31001.GE10.AUSTTXGR1CW.AUSTTXGR2QW", "9");
        assert_eq!(path.upstream_tid(), Some(Tid::new("AUSTTXGR1CW")));
        assert_eq!(path.downstream_tid(), Some(Tid::new("AUSTTXGR2QW")));
        assert!(path.is_hub_segment());

        let short = TransportPath::new("LONELY", "1");
        assert_eq!(short.upstream_tid(), None);
        assert!(!short.is_hub_segment());
    }

    #[test]
    fn passive_devices() {
        let mut device = Device::new(Tid::new("AUSTTXGR3AW"), DeviceRole::Mux);
        device.vendor = Vendor::Generic;
        assert!(device.is_passive());
        device.vendor = Vendor::Adva;
        device.model = "CWDM MUX 8".into();
        assert!(device.is_passive());
    }
}
