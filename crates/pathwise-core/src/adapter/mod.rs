//! # Vendor Device Adapters
//!
//! One implementation of [`VendorDeviceAdapter`] per vendor family, selected through
//! an [`AdapterRegistry`] keyed on `(vendor, model predicate)`. Each adapter turns the
//! raw command output of its platform into a [`PortConfig`].
//!
//! Adapters make one or more control-plane calls with a bounded timeout and never
//! retry. Any quirk of a platform, such as a second lookup or an alternate command,
//! stays private to that platform's adapter.

mod adva;
mod cisco;
mod juniper;
mod rad;

pub use adva::AdvaAdapter;
pub use cisco::{CiscoAdapter, CiscoPlatform};
pub use juniper::JuniperAdapter;
pub use rad::RadAdapter;

use crate::control_plane::{CommandRequest, DeviceControlPlane};
use crate::{Device, PathwiseError, Vendor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// A device did not answer, or answered with something the adapter cannot read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Device communication: {command} on {tid}: {detail}")]
pub struct DeviceCommunicationError {
    pub tid: String,
    pub command: String,
    pub detail: String,
}

impl From<DeviceCommunicationError> for PathwiseError {
    fn from(err: DeviceCommunicationError) -> Self {
        Self::DeviceCommunication {
            tid: err.tid,
            command: err.command,
            detail: err.detail,
        }
    }
}

// =============================================================================
// OBSERVATIONS
// =============================================================================

/// Negotiated speed and duplex of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplexRate {
    /// `None` when the port auto-negotiates and no rate was reported.
    pub speed_mbps: Option<u64>,
    pub full_duplex: bool,
}

impl DuplexRate {
    /// Parse strings like `"auto-1000-full"`, `"100-full"` or `"1000-x-full-duplex"`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return None;
        }
        let mut speed_mbps = None;
        let mut full_duplex = false;
        for token in lower.split(['-', '_', ' ']) {
            if let Ok(n) = token.parse::<u64>() {
                speed_mbps = Some(n);
            } else if token == "full" {
                full_duplex = true;
            }
        }
        Some(Self {
            speed_mbps,
            full_duplex,
        })
    }
}

/// Configuration of one device port as observed on the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub port_id: Option<String>,
    /// Text that evidences which circuit the port carries.
    pub description: Option<String>,
    /// The platform tied the port to the circuit through its VLAN, so the
    /// description need not name the circuit.
    #[serde(default)]
    pub confirmed_by_vlan: bool,
    /// VLANs configured on the port. `None` when the platform does not report them.
    pub vlan_members: Option<Vec<String>>,
    pub duplex_rate: Option<DuplexRate>,
    pub encapsulation: Option<String>,
    pub ipv4: Option<String>,
}

/// True when `description` names the circuit or one of its legacy ids.
#[must_use]
pub fn description_confirms(description: &str, circuit_id: &str, aliases: &[String]) -> bool {
    let upper = description.to_ascii_uppercase();
    std::iter::once(circuit_id)
        .chain(aliases.iter().map(String::as_str))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .any(|id| upper.contains(&id.to_ascii_uppercase()))
}

/// True when `vlan` appears in `members`, either literally or inside an `a-b` range.
#[must_use]
pub fn vlan_listed(members: &[String], vlan: &str) -> bool {
    let Ok(wanted) = vlan.trim().parse::<u32>() else {
        return members.iter().any(|m| m.trim() == vlan.trim());
    };
    members.iter().any(|member| {
        let member = member.trim();
        match member.split_once('-') {
            Some((lo, hi)) => match (lo.trim().parse::<u32>(), hi.trim().parse::<u32>()) {
                (Ok(lo), Ok(hi)) => (lo..=hi).contains(&wanted),
                _ => false,
            },
            None => member.parse::<u32>().is_ok_and(|m| m == wanted),
        }
    })
}

// =============================================================================
// PROBE
// =============================================================================

/// Everything an adapter needs to query one device.
pub struct Probe<'a> {
    pub device: &'a Device,
    pub circuit_id: &'a str,
    pub control_plane: &'a dyn DeviceControlPlane,
    pub timeout: Duration,
}

impl Probe<'_> {
    /// Run one command against the probed device.
    pub fn run(&self, command: &str, parameters: Value) -> Result<Value, DeviceCommunicationError> {
        let request =
            CommandRequest::new(command, &self.device.tid, self.timeout).with_parameters(parameters);
        tracing::debug!(tid = %self.device.tid, command, "device command");
        self.control_plane
            .execute(&request)
            .map_err(|e| self.failure(command, e.to_string()))
    }

    /// Communication error for `command` on this device.
    #[must_use]
    pub fn failure(&self, command: &str, detail: impl Into<String>) -> DeviceCommunicationError {
        DeviceCommunicationError {
            tid: self.device.tid.to_string(),
            command: command.to_string(),
            detail: detail.into(),
        }
    }

    /// The device port, lower-cased as most platforms expect it.
    pub fn port_parameter(&self, command: &str) -> Result<String, DeviceCommunicationError> {
        self.device
            .port
            .as_deref()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| self.failure(command, "device has no port in inventory"))
    }
}

/// Elements of a value that may be a list or a single object.
pub(crate) fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single],
    }
}

/// A string or number field as text.
pub(crate) fn text(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// ADAPTER TRAIT
// =============================================================================

/// Uniform capability interface over a vendor family.
pub trait VendorDeviceAdapter {
    /// Short family name used in logs.
    fn family(&self) -> &'static str;

    /// Read the configuration of the device's circuit port.
    fn port_config(&self, probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError>;

    /// Port description only.
    fn description(&self, probe: &Probe<'_>) -> Result<Option<String>, DeviceCommunicationError> {
        Ok(self.port_config(probe)?.description)
    }

    /// VLAN membership only.
    fn vlan_membership(
        &self,
        probe: &Probe<'_>,
    ) -> Result<Option<Vec<String>>, DeviceCommunicationError> {
        Ok(self.port_config(probe)?.vlan_members)
    }

    /// Live negotiated speed and duplex. Only customer-facing platforms report it.
    fn duplex_rate(&self, probe: &Probe<'_>) -> Result<DuplexRate, DeviceCommunicationError> {
        Err(probe.failure("duplex_rate", format!("{} does not report duplex", self.family())))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Predicate over the upper-cased model string.
pub type ModelPredicate = fn(&str) -> bool;

/// Any model.
#[must_use]
pub fn any_model(_: &str) -> bool {
    true
}

struct Registration {
    vendor: Vendor,
    predicate: ModelPredicate,
    adapter: Box<dyn VendorDeviceAdapter>,
}

/// Lookup table from `(vendor, model predicate)` to adapter.
///
/// Entries are tried in registration order; register narrow predicates first.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: Vec<Registration>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        vendor: Vendor,
        predicate: ModelPredicate,
        adapter: Box<dyn VendorDeviceAdapter>,
    ) {
        self.entries.push(Registration {
            vendor,
            predicate,
            adapter,
        });
    }

    /// The four supported families.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Vendor::Juniper, any_model, Box::new(JuniperAdapter));
        registry.register(
            Vendor::Cisco,
            |model| model.contains("ME-3400"),
            Box::new(CiscoAdapter::new(CiscoPlatform::Me3400)),
        );
        registry.register(
            Vendor::Cisco,
            |model| model.contains("ASR-920"),
            Box::new(CiscoAdapter::new(CiscoPlatform::Asr920)),
        );
        registry.register(
            Vendor::Cisco,
            any_model,
            Box::new(CiscoAdapter::new(CiscoPlatform::Router)),
        );
        registry.register(Vendor::Adva, any_model, Box::new(AdvaAdapter));
        registry.register(Vendor::Rad, any_model, Box::new(RadAdapter));
        registry
    }

    /// Adapter for a device.
    pub fn resolve(&self, device: &Device) -> Result<&dyn VendorDeviceAdapter, PathwiseError> {
        let model = device.model.to_ascii_uppercase();
        self.entries
            .iter()
            .find(|entry| entry.vendor == device.vendor && (entry.predicate)(&model))
            .map(|entry| entry.adapter.as_ref())
            .ok_or_else(|| PathwiseError::UnsupportedVendor {
                vendor: device.vendor.to_string(),
                model: device.model.clone(),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================
