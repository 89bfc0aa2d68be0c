//! ADVA customer premises and MTU devices.
//!
//! GE114 models list 1G access flows; other models list Ethernet ports with their
//! flow points. When the primary listing fails the 10G flow listing is tried once.

use super::{
    DeviceCommunicationError, DuplexRate, PortConfig, Probe, VendorDeviceAdapter, as_list, text,
};
use serde_json::{Value, json};

const ONE_GIG_FLOWS: &str = "1g_adva_flows";
const ETH_PORTS: &str = "seefa-cd-list_eth_ports.json";
const TEN_GIG_FLOWS: &str = "10g_adva_flows";
const ACCESS_PORTS: &str = "list_access_ports.json";

/// Uplink interfaces that carry every circuit's flow and prove nothing.
const UPLINK_INTERFACES: [(&str, &str); 2] =
    [("116", "eth_port-1-1-1-8"), ("120", "eth_port-1-1-1-26")];

pub struct AdvaAdapter;

impl AdvaAdapter {
    /// Run the primary listing for this model, falling back to the 10G flows.
    fn flows(probe: &Probe<'_>) -> Result<(&'static str, Value), DeviceCommunicationError> {
        let primary = if probe.device.model.contains("114") {
            ONE_GIG_FLOWS
        } else {
            ETH_PORTS
        };
        match probe.run(primary, Value::Null) {
            Ok(response) => Ok((primary, response)),
            Err(err) => {
                tracing::debug!(tid = %probe.device.tid, "{}; trying {}", err, TEN_GIG_FLOWS);
                probe.run(TEN_GIG_FLOWS, Value::Null).map(|r| (TEN_GIG_FLOWS, r))
            }
        }
    }

    fn is_uplink(model: &str, interface: &str) -> bool {
        UPLINK_INTERFACES
            .iter()
            .any(|(family, uplink)| model.contains(family) && interface.contains(uplink))
    }
}

impl VendorDeviceAdapter for AdvaAdapter {
    fn family(&self) -> &'static str {
        "adva"
    }

    fn port_config(&self, probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let (command, response) = Self::flows(probe)?;
        let circuit = probe.circuit_id.to_ascii_uppercase();

        let owning = if command == ONE_GIG_FLOWS {
            as_list(response.get("result")).into_iter().find_map(|flow| {
                let evc = text(flow, "/properties/epAccessFlowEVCName")?;
                (evc.to_ascii_uppercase() == circuit).then(|| {
                    (evc, text(flow, "/properties/epAccessFlowAccessInterface"))
                })
            })
        } else {
            let flow_points = as_list(response.get("result"))
                .last()
                .and_then(|last| last.get("flow_point"));
            as_list(flow_points).into_iter().find_map(|point| {
                let interface = text(point, "/properties/interface")?;
                if Self::is_uplink(&probe.device.model, &interface) {
                    return None;
                }
                let alias = text(point, "/properties/alias")?;
                alias
                    .to_ascii_uppercase()
                    .contains(&circuit)
                    .then_some((alias, Some(interface)))
            })
        };

        let (description, port_id) = match owning {
            Some((description, interface)) => (
                Some(description),
                interface.map(|i| i.to_ascii_uppercase()),
            ),
            None => (None, None),
        };

        Ok(PortConfig {
            port_id,
            description,
            vlan_members: None,
            ..PortConfig::default()
        })
    }

    fn duplex_rate(&self, probe: &Probe<'_>) -> Result<DuplexRate, DeviceCommunicationError> {
        let port = probe.port_parameter(ACCESS_PORTS)?;
        let response = probe.run(ACCESS_PORTS, Value::Null)?;
        let entry = as_list(response.get("result"))
            .into_iter()
            .find(|p| text(p, "/label").is_some_and(|label| label.eq_ignore_ascii_case(&port)))
            .ok_or_else(|| probe.failure(ACCESS_PORTS, format!("port {port} not listed")))?;

        let negotiated = text(entry, "/properties/negotiated_port_speed")
            .and_then(|s| DuplexRate::parse(&s))
            .filter(|rate| rate.speed_mbps.is_some());
        negotiated
            .or_else(|| {
                text(entry, "/properties/configured_port_speed").and_then(|s| DuplexRate::parse(&s))
            })
            .ok_or_else(|| probe.failure(ACCESS_PORTS, "no port speed reported"))
    }
}
