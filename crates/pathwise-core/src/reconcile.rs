//! # Reconciliation Engine
//!
//! Drives the vendor adapters over the inventory view of a circuit and diffs what
//! the network reports against what the inventory declares.
//!
//! Devices are queried one at a time, hub first. Nothing is written anywhere: the
//! only side effects are control-plane reads and, for devices the control plane
//! does not know yet, an onboarding request followed by a bounded readiness poll.

use crate::adapter::{AdapterRegistry, PortConfig, Probe, description_confirms, vlan_listed};
use crate::config::EngineConfig;
use crate::control_plane::{ActivationStatus, DeviceControlPlane};
use crate::diagnostics::Diagnostics;
use crate::graph::CircuitRecord;
use crate::inventory::{InventoryError, InventoryStore};
use crate::poll::{Sleeper, poll_until};
use crate::primitives::LEGACY_ID_ATTRIBUTE;
use crate::{Device, DeviceRole, Mismatch, MismatchField, PathwiseError, ReconciliationVerdict};

/// Compares inventory devices against live device configuration.
pub struct ReconciliationEngine<'a> {
    registry: &'a AdapterRegistry,
    control_plane: &'a dyn DeviceControlPlane,
    inventory: &'a dyn InventoryStore,
    config: &'a EngineConfig,
    sleeper: &'a dyn Sleeper,
}

/// Legacy ids of the circuit, fetched on first use.
struct LegacyIds<'a> {
    inventory: &'a dyn InventoryStore,
    instance_id: Option<&'a str>,
    loaded: Option<Vec<String>>,
}

impl LegacyIds<'_> {
    fn get(&mut self) -> Result<&[String], PathwiseError> {
        if self.loaded.is_none() {
            let ids = match self.instance_id {
                Some(instance) => match self.inventory.attribute_values(instance, LEGACY_ID_ATTRIBUTE) {
                    Ok(values) => values
                        .iter()
                        .flat_map(|v| v.split(','))
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect(),
                    Err(InventoryError::NotFound(_)) => Vec::new(),
                    Err(err) => return Err(err.into()),
                },
                None => Vec::new(),
            };
            tracing::debug!(count = ids.len(), "legacy ids loaded");
            self.loaded = Some(ids);
        }
        Ok(self.loaded.as_deref().unwrap_or_default())
    }
}

impl<'a> ReconciliationEngine<'a> {
    #[must_use]
    pub fn new(
        registry: &'a AdapterRegistry,
        control_plane: &'a dyn DeviceControlPlane,
        inventory: &'a dyn InventoryStore,
        config: &'a EngineConfig,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            registry,
            control_plane,
            inventory,
            config,
            sleeper,
        }
    }

    /// Reconcile the inventory view of a circuit against the network.
    ///
    /// With `skip_cpe_check`, a CPE that cannot be queried is recorded in
    /// `diagnostics` and replaced by an unreachable placeholder. Every other query
    /// failure aborts the pass.
    ///
    /// # Errors
    /// - `DeviceCommunication` or `PollTimeout` for a required device
    /// - `UnsupportedVendor` when no adapter matches a required device
    /// - inventory errors from the legacy id lookup
    pub fn reconcile(
        &self,
        sor_devices: &[Device],
        circuit: &CircuitRecord,
        skip_cpe_check: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<ReconciliationVerdict, PathwiseError> {
        let mut legacy = LegacyIds {
            inventory: self.inventory,
            instance_id: circuit.instance_id.as_deref(),
            loaded: None,
        };
        let mut sor_view = Vec::new();
        let mut network_view = Vec::new();
        let mut mismatches = Vec::new();

        for device in sor_devices {
            if device.port.is_none() {
                tracing::debug!(tid = %device.tid, "no port in inventory, not reconciled");
                continue;
            }
            sor_view.push(device.clone());

            let config = match self.observe(device, &circuit.circuit_id) {
                Ok(config) => config,
                Err(err) if skip_cpe_check && device.role == DeviceRole::Cpe => {
                    diagnostics.tolerated(&err);
                    let mut placeholder = device.clone();
                    placeholder.description = None;
                    placeholder.unreachable = true;
                    network_view.push(placeholder);
                    continue;
                }
                Err(err) => return Err(err),
            };

            mismatches.extend(Self::compare(device, &config, circuit, &mut legacy)?);
            network_view.push(Self::network_device(device, config));
        }

        let passed = mismatches.is_empty();
        tracing::info!(
            circuit = %circuit.circuit_id,
            devices = sor_view.len(),
            mismatches = mismatches.len(),
            passed,
            "reconciliation complete"
        );
        Ok(ReconciliationVerdict {
            passed,
            sor_view,
            network_view,
            mismatches,
        })
    }

    /// Make sure the control plane can reach `device`, onboarding it if needed.
    pub fn ensure_active(&self, device: &Device) -> Result<(), PathwiseError> {
        let communication = |command: &str, detail: String| PathwiseError::DeviceCommunication {
            tid: device.tid.to_string(),
            command: command.to_string(),
            detail,
        };

        let status = self
            .control_plane
            .device_status(&device.tid)
            .map_err(|e| communication("device_status", e.to_string()))?;
        match status {
            ActivationStatus::Active => return Ok(()),
            ActivationStatus::Failed(reason) => return Err(communication("device_status", reason)),
            ActivationStatus::Pending | ActivationStatus::Unknown => {}
        }

        tracing::info!(tid = %device.tid, "device not active, requesting onboarding");
        self.control_plane
            .onboard(&device.tid)
            .map_err(|e| communication("onboard", e.to_string()))?;

        let what = format!("{} to become active", device.tid);
        poll_until(&what, self.config.onboarding, self.sleeper, |_| {
            match self.control_plane.device_status(&device.tid) {
                Ok(ActivationStatus::Active) => Some(Ok(())),
                Ok(ActivationStatus::Failed(reason)) => Some(Err(communication("onboard", reason))),
                Ok(_) | Err(_) => None,
            }
        })?
    }

    /// Query one device through its adapter.
    pub fn observe(&self, device: &Device, circuit_id: &str) -> Result<PortConfig, PathwiseError> {
        let adapter = self.registry.resolve(device)?;
        self.ensure_active(device)?;
        let probe = Probe {
            device,
            circuit_id,
            control_plane: self.control_plane,
            timeout: self.config.device_timeout(),
        };
        tracing::debug!(tid = %device.tid, family = adapter.family(), "probing device");
        Ok(adapter.port_config(&probe)?)
    }

    fn compare(
        device: &Device,
        observed: &PortConfig,
        circuit: &CircuitRecord,
        legacy: &mut LegacyIds<'_>,
    ) -> Result<Vec<Mismatch>, PathwiseError> {
        let mismatch = |field, want: &str, got: &str| Mismatch {
            tid: device.tid.to_string(),
            field,
            expected: want.to_string(),
            observed: got.to_string(),
        };

        if observed.port_id.is_none()
            && observed.description.is_none()
            && observed.vlan_members.as_ref().is_none_or(Vec::is_empty)
        {
            return Ok(vec![mismatch(
                MismatchField::Missing,
                &circuit.circuit_id,
                "no port carries the circuit",
            )]);
        }

        let mut found = Vec::new();

        let description = observed.description.as_deref().unwrap_or_default();
        if !observed.confirmed_by_vlan
            && !description_confirms(description, &circuit.circuit_id, &[])
            && !description_confirms(description, "", legacy.get()?)
        {
            found.push(mismatch(
                MismatchField::Description,
                &circuit.circuit_id,
                description,
            ));
        }

        if let (Some(vlan), Some(members)) = (device.vlan_id.as_deref(), &observed.vlan_members) {
            if !vlan_listed(members, vlan) {
                found.push(mismatch(MismatchField::Vlan, vlan, &members.join(",")));
            }
        }

        if circuit.is_routed() && device.role == DeviceRole::Hub {
            let expected = circuit.ipv4_gateway.as_deref().unwrap_or_default();
            let actual = observed.ipv4.as_deref().unwrap_or_default();
            if expected.is_empty() || host_part(expected) != host_part(actual) {
                found.push(mismatch(MismatchField::Ipv4, expected, actual));
            }
        }

        Ok(found)
    }

    fn network_device(sor: &Device, observed: PortConfig) -> Device {
        let mut device = sor.clone();
        device.port = observed.port_id.or(device.port);
        device.description = observed.description;
        device.ipv4 = observed.ipv4;
        device.vlan_id = match (&sor.vlan_id, observed.vlan_members) {
            (Some(vlan), Some(members)) if vlan_listed(&members, vlan) => Some(vlan.clone()),
            (_, Some(members)) => members.into_iter().next(),
            (vlan, None) => vlan.clone(),
        };
        device
    }
}

/// Address without its prefix length.
fn host_part(address: &str) -> &str {
    address.split('/').next().unwrap_or_default().trim()
}

// =============================================================================
// TESTS
// =============================================================================
