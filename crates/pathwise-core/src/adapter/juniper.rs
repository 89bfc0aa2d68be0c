//! Juniper routers (hub and QFX aggregation).

use super::{DeviceCommunicationError, PortConfig, Probe, VendorDeviceAdapter, as_list, text};
use serde_json::{Value, json};

const SHOW_INTERFACES: &str = "show_interfaces";

/// Reads interface units from `show_interfaces`.
pub struct JuniperAdapter;

impl JuniperAdapter {
    /// VLAN of a logical unit: `vlan-id` on routers, ethernet-switching members on QFX.
    fn unit_vlans(unit: &Value) -> Vec<String> {
        if let Some(vlan) = text(unit, "/vlan-id") {
            return vec![vlan];
        }
        as_list(unit.pointer("/family/ethernet-switching/vlan/members"))
            .into_iter()
            .filter_map(|member| match member {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl VendorDeviceAdapter for JuniperAdapter {
    fn family(&self) -> &'static str {
        "juniper"
    }

    fn port_config(&self, probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let port = probe.port_parameter(SHOW_INTERFACES)?;
        let response = probe.run(SHOW_INTERFACES, json!({ "name": port }))?;
        let interface = response
            .pointer("/result/data/configuration/interfaces/interface")
            .ok_or_else(|| probe.failure(SHOW_INTERFACES, "no interface configuration returned"))?;

        let wanted = probe.device.vlan_id.as_deref();
        let mut members = Vec::new();
        let mut circuit_unit = None;
        for unit in as_list(interface.get("unit")) {
            let vlans = Self::unit_vlans(unit);
            if circuit_unit.is_none() && wanted.is_some_and(|w| vlans.iter().any(|v| v == w)) {
                circuit_unit = Some(unit);
            }
            members.extend(vlans);
        }

        Ok(PortConfig {
            port_id: probe.device.port.clone(),
            description: circuit_unit.and_then(|u| text(u, "/description")),
            confirmed_by_vlan: false,
            vlan_members: Some(members),
            duplex_rate: None,
            encapsulation: text(interface, "/encapsulation"),
            ipv4: circuit_unit.and_then(|u| text(u, "/family/inet/address/name")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::{ControlPlaneError, ScriptedControlPlane};
    use crate::{Device, DeviceRole, Tid, Vendor};
    use std::time::Duration;

    const CID: &str = "51.L1XX.004512..CHTR";

    fn hub() -> Device {
        let mut device = Device::new(Tid::new("AUSTTXGR1CW"), DeviceRole::Hub);
        device.vendor = Vendor::Juniper;
        device.port = Some("AE17".into());
        device.vlan_id = Some("1100".into());
        device
    }

    fn probe<'a>(device: &'a Device, plane: &'a ScriptedControlPlane) -> Probe<'a> {
        Probe {
            device,
            circuit_id: CID,
            control_plane: plane,
            timeout: Duration::from_secs(120),
        }
    }

    #[test]
    fn reads_matching_unit() {
        let plane = ScriptedControlPlane::new().reply(
            "AUSTTXGR1CW",
            SHOW_INTERFACES,
            json!({"result": {"data": {"configuration": {"interfaces": {"interface": {
                "name": "ae17",
                "encapsulation": "flexible-ethernet-services",
                "unit": [
                    {"name": "1000", "vlan-id": "1000", "description": "other"},
                    {"name": "1100", "vlan-id": 1100, "description": "CID:51.L1XX.004512..CHTR",
                     "family": {"inet": {"address": {"name": "10.1.1.1/30"}}}}
                ]
            }}}}}}),
        );
        let device = hub();
        let config = JuniperAdapter
            .port_config(&probe(&device, &plane))
            .expect("port config");

        assert_eq!(config.description.as_deref(), Some("CID:51.L1XX.004512..CHTR"));
        assert_eq!(config.vlan_members, Some(vec!["1000".to_string(), "1100".to_string()]));
        assert_eq!(config.ipv4.as_deref(), Some("10.1.1.1/30"));
        assert_eq!(config.encapsulation.as_deref(), Some("flexible-ethernet-services"));
        assert_eq!(plane.calls()[0].parameters, json!({"name": "ae17"}));
    }

    #[test]
    fn qfx_switching_members() {
        let plane = ScriptedControlPlane::new().reply(
            "AUSTTXGR1CW",
            SHOW_INTERFACES,
            json!({"result": {"data": {"configuration": {"interfaces": {"interface": {
                "unit": {"family": {"ethernet-switching": {"vlan": {"members": ["1100", "1200"]}}},
                         "description": "CID:51.L1XX.004512..CHTR"}
            }}}}}}),
        );
        let device = hub();
        let config = JuniperAdapter
            .port_config(&probe(&device, &plane))
            .expect("port config");
        assert_eq!(config.vlan_members.map(|m| m.len()), Some(2));
        assert!(config.description.is_some());
    }

    #[test]
    fn command_failure_names_the_command() {
        let plane = ScriptedControlPlane::new().fail(
            "AUSTTXGR1CW",
            SHOW_INTERFACES,
            ControlPlaneError::Timeout(Duration::from_secs(120)),
        );
        let device = hub();
        let err = JuniperAdapter
            .port_config(&probe(&device, &plane))
            .expect_err("timeout");
        assert_eq!(err.command, SHOW_INTERFACES);
        assert_eq!(err.tid, "AUSTTXGR1CW");
    }

    #[test]
    fn unexpected_shape_is_communication_error() {
        let plane =
            ScriptedControlPlane::new().reply("AUSTTXGR1CW", SHOW_INTERFACES, json!({"result": {}}));
        let device = hub();
        assert!(JuniperAdapter.port_config(&probe(&device, &plane)).is_err());
    }
}
