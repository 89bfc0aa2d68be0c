//! # Path Graph Builder
//!
//! Turns the flat, leveled element listing of a circuit into a [`PathGraph`].
//!
//! - Reject passive optical topologies before anything else
//! - Skip elements whose status takes no part in the topology
//! - Classify every named device on this pass
//! - Reject ports shared between links and links that loop
//! - Require a hub and a customer device

use crate::graph::{CircuitRecord, Handoff, Link, PathGraph};
use crate::role::RoleClassifier;
use crate::types::non_empty;
use crate::{Bandwidth, Device, DeviceRole, ElementType, Level, PathElement, PathwiseError, Vendor};

/// Builds path graphs from inventory element listings.
pub struct PathGraphBuilder;

impl PathGraphBuilder {
    /// Validate a single element.
    ///
    /// Returns `UnsupportedTopology` for elements on a passive optical network.
    pub fn validate(element: &PathElement) -> Result<(), PathwiseError> {
        if element.is_passive_optical() {
            return Err(PathwiseError::UnsupportedTopology(format!(
                "EPON topology is unsupported ({})",
                element.category()
            )));
        }
        Ok(())
    }

    /// Build the graph for `circuit_id` from all of its elements, every level.
    ///
    /// # Errors
    /// - `UnsupportedTopology` if any element is passive optical
    /// - `MultiplyLinkedPort` if a device port is used by two links
    /// - `TopologyLoop` if the transport links form a cycle
    /// - `MissingDevice` if no hub or no customer device is present
    pub fn build(circuit_id: &str, elements: &[PathElement]) -> Result<PathGraph, PathwiseError> {
        for element in elements {
            Self::validate(element)?;
        }

        let mut graph = PathGraph::new(CircuitRecord::from_elements(circuit_id, elements));

        for element in elements.iter().filter(|e| e.is_eligible()) {
            if element.level == Level::Transport && element.element_type == ElementType::Path {
                Self::ingest_link(&mut graph, element);
            }
            if element.element_type == ElementType::Port {
                if let Some(handoff) = Handoff::from_element(element) {
                    graph.set_handoff(handoff);
                }
            }
            Self::ingest_device(&mut graph, element)?;
        }

        graph.check_acyclic()?;
        graph.finish();

        if !graph.has_hub() {
            return Err(PathwiseError::MissingDevice(DeviceRole::Hub));
        }
        if !graph.has_cpe() {
            return Err(PathwiseError::MissingDevice(DeviceRole::Cpe));
        }

        tracing::debug!(
            circuit = circuit_id,
            devices = graph.device_count(),
            links = graph.link_count(),
            "path graph built"
        );
        Ok(graph)
    }

    /// A level-1 `PATH` element references a transport path by name.
    fn ingest_link(graph: &mut PathGraph, element: &PathElement) {
        let Some(name) = non_empty(element.element_name.as_deref()) else {
            return;
        };
        let Some(mut link) = Link::from_name(name) else {
            tracing::debug!(name, "transport name without endpoints skipped");
            return;
        };
        link.instance_id = non_empty(element.element_reference.as_deref()).map(str::to_string);
        link.bandwidth = non_empty(element.element_bandwidth.as_deref())
            .and_then(|bw| Bandwidth::parse(bw).ok());
        link.category = element.category().to_string();
        graph.insert_link(link);
    }

    fn ingest_device(graph: &mut PathGraph, element: &PathElement) -> Result<(), PathwiseError> {
        let Some(tid) = element.tid() else {
            return Ok(());
        };
        let Some(role) = RoleClassifier::classify(&tid, element.level, Some(&element.path_name))
        else {
            tracing::debug!(tid = %tid, "device with no role convention skipped");
            return Ok(());
        };

        let port = Self::select_port(element, &tid, role);
        if let Some(port) = &port {
            graph.attach_port(&tid, port, element.path_name.trim())?;
        }

        let mut device = Device::new(tid, role);
        device.port = port;
        device.vendor = element
            .vendor
            .as_deref()
            .map(Vendor::from_name)
            .unwrap_or_default();
        device.model = non_empty(element.model.as_deref())
            .unwrap_or_default()
            .to_string();
        if element.level == Level::Service && Link::from_name(&element.path_name).is_some() {
            device.transport = Some(element.path_name.trim().to_string());
        }
        graph.insert_device(device);
        Ok(())
    }

    /// Port a record contributes for its device, if any.
    ///
    /// On the service level a hub contributes the first segment of a router-to-router
    /// leg name, and aggregation or mux devices contribute a port only on the path that
    /// leaves from them.
    fn select_port(element: &PathElement, tid: &crate::Tid, role: DeviceRole) -> Option<String> {
        match (element.level, role) {
            (Level::Transport, _) | (Level::Service, DeviceRole::Cpe) => {
                element.port_access_id().map(str::to_string)
            }
            (Level::Service, DeviceRole::Hub) => {
                let leg = non_empty(element.leg_name.as_deref())?;
                if leg == "1" || !leg.contains('/') {
                    return None;
                }
                leg.split('/').next().map(|s| s.trim().to_string())
            }
            (Level::Service, DeviceRole::Agg | DeviceRole::Mux) => {
                let leaves_here = element
                    .path_name
                    .split('.')
                    .nth(2)
                    .is_some_and(|segment| segment.trim().eq_ignore_ascii_case(tid.as_str()));
                if leaves_here {
                    element.port_access_id().map(str::to_string)
                } else {
                    None
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tid;

    const CIRCUIT: &str = "51.L1XX.004512..CHTR";
    const TRANSPORT: &str = "31001.GE1.AUSTTXGR1CW.AUSTTXZB1ZW";

    fn element(level: Level, path: &str, kind: ElementType, tid: Option<&str>) -> PathElement {
        PathElement {
            level,
            path_name: path.into(),
            path_instance_id: Some("100".into()),
            element_type: kind,
            element_status: "LIVE".into(),
            tid: tid.map(str::to_string),
            ..PathElement::default()
        }
    }

    fn simple_circuit() -> Vec<PathElement> {
        let mut transport = element(Level::Transport, CIRCUIT, ElementType::Path, None);
        transport.element_name = Some(TRANSPORT.into());
        transport.element_reference = Some("200".into());
        transport.element_bandwidth = Some("1 Gbps".into());

        let mut hub = element(Level::Service, TRANSPORT, ElementType::Port, Some("AUSTTXGR1CW"));
        hub.leg_name = Some("AE17/AE17.1100".into());
        hub.vendor = Some("JUNIPER".into());
        hub.model = Some("MX960".into());

        let mut cpe = element(Level::Transport, CIRCUIT, ElementType::Port, Some("AUSTTXZB1ZW"));
        cpe.port_access_id = Some("ETH PORT 5".into());
        cpe.vendor = Some("RAD".into());
        cpe.channel = Some("VLAN1100".into());
        cpe.bandwidth = Some("100 Mbps".into());

        vec![transport, hub, cpe]
    }

    #[test]
    fn builds_hub_to_cpe_circuit() {
        let graph = PathGraphBuilder::build(CIRCUIT, &simple_circuit()).expect("valid circuit");

        assert!(graph.has_hub() && graph.has_cpe());
        assert!(!graph.has_agg() && !graph.has_mux());

        let hub = graph.device(&Tid::new("AUSTTXGR1CW")).expect("hub");
        assert_eq!(hub.port.as_deref(), Some("AE17"));
        assert_eq!(hub.vlan_id.as_deref(), Some("1100"));
        assert_eq!(hub.transport.as_deref(), Some(TRANSPORT));

        let cpe = graph.device(&Tid::new("AUSTTXZB1ZW")).expect("cpe");
        assert_eq!(cpe.vendor, Vendor::Rad);
        assert_eq!(cpe.port.as_deref(), Some("ETH PORT 5"));
        assert_eq!(cpe.transport.as_deref(), Some(TRANSPORT));

        let link = graph.link(TRANSPORT).expect("link");
        assert_eq!(link.instance_id.as_deref(), Some("200"));
        assert_eq!(link.bandwidth, Some(Bandwidth::from_gbps(1)));
        assert_eq!(graph.circuit().bandwidth, Some(Bandwidth::from_mbps(100)));
    }

    #[test]
    fn passive_optical_rejected_before_anything_else() {
        let mut elements = simple_circuit();
        let mut olt = element(Level::Transport, CIRCUIT, ElementType::Port, Some("AUSTTXOL1XX"));
        olt.element_category = Some("OPTICAL LINE TERMINAL".into());
        olt.element_status = "PLANNED".into();
        elements.push(olt);

        let err = PathGraphBuilder::build(CIRCUIT, &elements);
        assert!(matches!(err, Err(PathwiseError::UnsupportedTopology(_))));
    }

    #[test]
    fn ineligible_status_is_ignored() {
        let mut elements = simple_circuit();
        elements[2].element_status = "PENDING".into();
        let err = PathGraphBuilder::build(CIRCUIT, &elements);
        assert_eq!(err.err(), Some(PathwiseError::MissingDevice(DeviceRole::Cpe)));
    }

    #[test]
    fn missing_hub_is_fatal() {
        let elements: Vec<PathElement> = simple_circuit()
            .into_iter()
            .filter(|e| e.tid.as_deref() != Some("AUSTTXGR1CW"))
            .collect();
        let err = PathGraphBuilder::build(CIRCUIT, &elements);
        assert_eq!(err.err(), Some(PathwiseError::MissingDevice(DeviceRole::Hub)));
    }

    #[test]
    fn shared_port_across_links_is_fatal() {
        let mut elements = simple_circuit();
        let mut other = element(
            Level::Service,
            "31002.GE1.AUSTTXGR1CW.AUSTTXZB2ZW",
            ElementType::Port,
            Some("AUSTTXGR1CW"),
        );
        other.leg_name = Some("AE17/AE17.1200".into());
        elements.push(other);

        let err = PathGraphBuilder::build(CIRCUIT, &elements);
        assert!(matches!(err, Err(PathwiseError::MultiplyLinkedPort { .. })));
    }

    #[test]
    fn service_level_agg_contributes_port_only_where_path_leaves_it() {
        let mut elements = simple_circuit();
        let mut leaving = element(
            Level::Service,
            "51001.GE1.AUSTTXGR2QW.AUSTTXZB1ZW",
            ElementType::Port,
            Some("AUSTTXGR2QW"),
        );
        leaving.port_access_id = Some("GE-0/0/3".into());
        let mut arriving = element(
            Level::Service,
            "51000.GE1.AUSTTXGR1CW.AUSTTXGR2QW",
            ElementType::Port,
            Some("AUSTTXGR2QW"),
        );
        arriving.port_access_id = Some("XE-0/0/0".into());
        elements.push(arriving);
        elements.push(leaving);

        let graph = PathGraphBuilder::build(CIRCUIT, &elements).expect("valid circuit");
        let agg = graph.device(&Tid::new("AUSTTXGR2QW")).expect("agg");
        assert_eq!(agg.role, DeviceRole::Agg);
        assert_eq!(agg.port.as_deref(), Some("GE-0/0/3"));
    }

    #[test]
    fn last_port_element_is_the_handoff() {
        let mut elements = simple_circuit();
        elements[2].element_bandwidth = Some("10/100/1000 BASET".into());
        elements[2].connector_type = Some("RJ-45".into());
        elements[2].port_channelization = Some("DYNAMIC".into());

        let graph = PathGraphBuilder::build(CIRCUIT, &elements).expect("valid circuit");
        let handoff = graph.handoff().expect("handoff");
        assert_eq!(handoff.tid, Tid::new("AUSTTXZB1ZW"));
        assert_eq!(handoff.port, "ETH PORT 5");
        assert_eq!(handoff.port_bandwidth.as_deref(), Some("10/100/1000 BASET"));
        assert!(handoff.is_dynamic());
    }
}
