//! # Path Graph
//!
//! Typed device/link graph of one circuit, built fresh for every pass.
//!
//! All data structures use `BTreeMap` for deterministic ordering, so two builds of
//! the same records always list devices and links in the same order.

use crate::types::non_empty;
use crate::{Bandwidth, Device, DeviceRole, PathElement, PathwiseError, Tid, TransportPath};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// CIRCUIT RECORD
// =============================================================================

/// Circuit-level attributes collected from the element listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub circuit_id: String,
    pub instance_id: Option<String>,
    pub bandwidth: Option<Bandwidth>,
    pub vlan: Option<String>,
    pub ipv4_assigned_subnet: Option<String>,
    pub ipv4_gateway: Option<String>,
    pub ipv4_glue_subnet: Option<String>,
    pub ipv4_service_type: Option<String>,
    pub z_site_type: Option<String>,
    pub z_site_name: Option<String>,
}

impl CircuitRecord {
    /// Collect the first value of each circuit attribute present in `elements`.
    #[must_use]
    pub fn from_elements(circuit_id: &str, elements: &[PathElement]) -> Self {
        fn first<'a>(
            elements: &'a [PathElement],
            field: impl Fn(&'a PathElement) -> Option<&'a str>,
        ) -> Option<String> {
            elements
                .iter()
                .find_map(|e| non_empty(field(e)))
                .map(str::to_string)
        }

        let own_rows: Vec<PathElement> = elements
            .iter()
            .filter(|e| e.path_name.trim() == circuit_id)
            .cloned()
            .collect();
        let instance_id = first(&own_rows, |e| e.path_instance_id.as_deref())
            .or_else(|| first(elements, |e| e.path_instance_id.as_deref()));

        Self {
            circuit_id: circuit_id.to_string(),
            instance_id,
            bandwidth: first(elements, |e| e.bandwidth.as_deref())
                .and_then(|bw| Bandwidth::parse(&bw).ok()),
            vlan: elements.iter().find_map(PathElement::vlan),
            ipv4_assigned_subnet: first(elements, |e| e.ipv4_assigned_subnet.as_deref()),
            ipv4_gateway: first(elements, |e| e.ipv4_gateway.as_deref()),
            ipv4_glue_subnet: first(elements, |e| e.ipv4_glue_subnet.as_deref()),
            ipv4_service_type: first(elements, |e| e.ipv4_service_type.as_deref()),
            z_site_type: first(elements, |e| e.z_site_type.as_deref()),
            z_site_name: first(elements, |e| e.z_site_name.as_deref()),
        }
    }

    /// Circuit carries a routed IP service.
    #[must_use]
    pub fn is_routed(&self) -> bool {
        self.ipv4_service_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("ROUTED"))
    }
}

// =============================================================================
// LINKS
// =============================================================================

/// A level-1 transport link between two devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub instance_id: Option<String>,
    pub upstream: Tid,
    pub downstream: Tid,
    pub bandwidth: Option<Bandwidth>,
    pub category: String,
}

impl Link {
    /// Parse a dotted transport name into a link. Needs at least four segments.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let segments: Vec<&str> = name.trim().split('.').collect();
        if segments.len() < 4 {
            return None;
        }
        let downstream = non_empty(segments.last().copied())?;
        let upstream = non_empty(Some(segments[segments.len() - 2]))?;
        Some(Self {
            name: name.trim().to_string(),
            instance_id: None,
            upstream: Tid::new(upstream),
            downstream: Tid::new(downstream),
            bandwidth: None,
            category: String::new(),
        })
    }

    /// The link as a transport path record.
    #[must_use]
    pub fn to_transport_path(&self) -> TransportPath {
        let mut path = TransportPath::new(&self.name, self.instance_id.clone().unwrap_or_default());
        path.bandwidth_nominal = self.bandwidth.unwrap_or_default();
        path
    }
}

// =============================================================================
// HANDOFF
// =============================================================================

/// The customer-facing port: the last port element of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub tid: Tid,
    pub port: String,
    pub port_bandwidth: Option<String>,
    pub connector_type: Option<String>,
    pub channelization: Option<String>,
}

impl Handoff {
    /// Handoff described by a port element, if it names a device and a port.
    #[must_use]
    pub fn from_element(element: &PathElement) -> Option<Self> {
        Some(Self {
            tid: element.tid()?,
            port: element.port_access_id()?.to_string(),
            port_bandwidth: non_empty(element.element_bandwidth.as_deref()).map(str::to_string),
            connector_type: non_empty(element.connector_type.as_deref()).map(str::to_string),
            channelization: non_empty(element.port_channelization.as_deref())
                .map(str::to_string),
        })
    }

    /// Port is channelized, i.e. provisioned as a trunk.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.channelization
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("DYNAMIC"))
    }
}

// =============================================================================
// PATH GRAPH
// =============================================================================

/// Devices and links of one circuit.
#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    circuit: CircuitRecord,
    devices: BTreeMap<Tid, Device>,
    links: BTreeMap<String, Link>,
    handoff: Option<Handoff>,
    /// (device, port) -> names of the links using it.
    ports: BTreeMap<(Tid, String), BTreeSet<String>>,
}

impl PathGraph {
    #[must_use]
    pub fn new(circuit: CircuitRecord) -> Self {
        Self {
            circuit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn circuit(&self) -> &CircuitRecord {
        &self.circuit
    }

    /// Record a port element as the handoff; the last one recorded wins.
    pub fn set_handoff(&mut self, handoff: Handoff) {
        self.handoff = Some(handoff);
    }

    #[must_use]
    pub fn handoff(&self) -> Option<&Handoff> {
        self.handoff.as_ref()
    }

    /// Insert a device, or fill in fields a previous record left empty.
    pub fn insert_device(&mut self, device: Device) {
        match self.devices.get_mut(&device.tid) {
            Some(existing) => {
                if existing.port.is_none() {
                    existing.port = device.port;
                }
                if existing.model.is_empty() {
                    existing.model = device.model;
                }
                if existing.vendor == crate::Vendor::Unknown {
                    existing.vendor = device.vendor;
                }
                if existing.transport.is_none() {
                    existing.transport = device.transport;
                }
            }
            None => {
                self.devices.insert(device.tid.clone(), device);
            }
        }
    }

    /// Insert a link. A repeated name keeps the first record.
    pub fn insert_link(&mut self, link: Link) {
        self.links.entry(link.name.clone()).or_insert(link);
    }

    /// Record that `port` on `tid` belongs to `link`.
    ///
    /// Returns `MultiplyLinkedPort` when the port already belongs to another link.
    pub fn attach_port(&mut self, tid: &Tid, port: &str, link: &str) -> Result<(), PathwiseError> {
        let users = self
            .ports
            .entry((tid.clone(), port.to_string()))
            .or_default();
        users.insert(link.to_string());
        if users.len() > 1 {
            return Err(PathwiseError::MultiplyLinkedPort {
                tid: tid.to_string(),
                port: port.to_string(),
            });
        }
        Ok(())
    }

    /// Reject links that close a cycle.
    ///
    /// A circuit is a chain from hub to CPE; any cycle means the inventory holds a
    /// loop that cannot be walked deterministically.
    pub fn check_acyclic(&self) -> Result<(), PathwiseError> {
        let mut parent: BTreeMap<&Tid, &Tid> = BTreeMap::new();

        fn root<'a>(parent: &BTreeMap<&'a Tid, &'a Tid>, mut node: &'a Tid) -> &'a Tid {
            while let Some(next) = parent.get(node) {
                if *next == node {
                    break;
                }
                node = *next;
            }
            node
        }

        for link in self.links.values() {
            let a = root(&parent, &link.upstream);
            let b = root(&parent, &link.downstream);
            if a == b {
                return Err(PathwiseError::TopologyLoop(link.downstream.to_string()));
            }
            parent.insert(a, b);
        }
        Ok(())
    }

    /// Fill derived fields once every record has been seen.
    pub(crate) fn finish(&mut self) {
        let vlan = self.circuit.vlan.clone();
        let gateway = self.circuit.ipv4_gateway.clone();
        let links: Vec<&Link> = self.links.values().collect();
        for device in self.devices.values_mut() {
            if device.transport.is_none() {
                device.transport = links
                    .iter()
                    .find(|l| l.downstream == device.tid)
                    .or_else(|| links.iter().find(|l| l.upstream == device.tid))
                    .map(|l| l.name.clone());
            }
            if device.vlan_id.is_none() {
                device.vlan_id = vlan.clone();
            }
            if device.role == DeviceRole::Hub && device.ipv4.is_none() {
                device.ipv4 = gateway.clone();
            }
        }
    }

    #[must_use]
    pub fn device(&self, tid: &Tid) -> Option<&Device> {
        self.devices.get(tid)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    #[must_use]
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn has_role(&self, role: DeviceRole) -> bool {
        self.devices.values().any(|d| d.role == role)
    }

    #[must_use]
    pub fn has_hub(&self) -> bool {
        self.has_role(DeviceRole::Hub)
    }

    #[must_use]
    pub fn has_agg(&self) -> bool {
        self.has_role(DeviceRole::Agg)
    }

    #[must_use]
    pub fn has_mux(&self) -> bool {
        self.has_role(DeviceRole::Mux)
    }

    #[must_use]
    pub fn has_cpe(&self) -> bool {
        self.has_role(DeviceRole::Cpe)
    }

    /// First device holding `role`, in TID order.
    #[must_use]
    pub fn first_with_role(&self, role: DeviceRole) -> Option<&Device> {
        self.devices.values().find(|d| d.role == role)
    }

    /// Devices to reconcile: hub first, CPE last, passive equipment left out.
    #[must_use]
    pub fn sor_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .devices
            .values()
            .filter(|d| !d.is_passive())
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.tid.cmp(&b.tid)));
        devices
    }

    /// Transport links that carry the circuit, as transport path records.
    #[must_use]
    pub fn transport_paths(&self) -> Vec<TransportPath> {
        self.links.values().map(Link::to_transport_path).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
