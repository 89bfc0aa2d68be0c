//! Cisco switches and routers.
//!
//! Three platforms report VLANs differently:
//! - ME-3400 switches: access or trunk VLANs in the running config
//! - ASR-920: description in the running config, VLAN as the service instance id
//! - other routers: VLAN as the sub-interface suffix

use super::{DeviceCommunicationError, PortConfig, Probe, VendorDeviceAdapter, as_list, text};
use serde_json::{Value, json};

const RUNNING_CONFIG: &str = "show_running_config_interface";
const SERVICE_INSTANCES: &str = "get_service_instances";
const SHOW_INTERFACES: &str = "show_interfaces";

/// Cisco platform variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiscoPlatform {
    Me3400,
    Asr920,
    Router,
}

/// Adapter for one Cisco platform.
pub struct CiscoAdapter {
    platform: CiscoPlatform,
}

impl CiscoAdapter {
    #[must_use]
    pub const fn new(platform: CiscoPlatform) -> Self {
        Self { platform }
    }

    fn me3400(probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let port = probe.port_parameter(RUNNING_CONFIG)?;
        let response = probe.run(RUNNING_CONFIG, json!({ "name": port }))?;
        let config = response
            .get("result")
            .ok_or_else(|| probe.failure(RUNNING_CONFIG, "no running config returned"))?;

        let trunk = text(config, "/switchport/mode").is_some_and(|m| m.eq_ignore_ascii_case("trunk"));
        let vlans = if trunk {
            text(config, "/switchport/vlan/trunk/allowed_vlans")
        } else {
            text(config, "/switchport/vlan/access_vlan")
        };
        let members = vlans
            .map(|list| list.split(',').map(|v| v.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(PortConfig {
            port_id: probe.device.port.clone(),
            description: text(config, "/description"),
            vlan_members: Some(members),
            encapsulation: Some(if trunk { "trunk" } else { "access" }.to_string()),
            ..PortConfig::default()
        })
    }

    fn asr920(probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let port = probe.port_parameter(RUNNING_CONFIG)?;
        let running = probe.run(RUNNING_CONFIG, json!({ "name": port }))?;
        let description = running.get("result").and_then(|c| text(c, "/description"));

        let instances = probe.run(SERVICE_INSTANCES, json!({ "name": port }))?;
        let instance_id = as_list(instances.get("result"))
            .first()
            .and_then(|first| text(first, "/instance_id"))
            .ok_or_else(|| probe.failure(SERVICE_INSTANCES, "no service instance on port"))?;

        Ok(PortConfig {
            port_id: probe.device.port.clone(),
            description,
            vlan_members: Some(vec![instance_id]),
            ..PortConfig::default()
        })
    }

    fn router(probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let port = probe.port_parameter(SHOW_INTERFACES)?;
        let response = probe.run(SHOW_INTERFACES, json!({ "name": port }))?;
        let wanted = probe.device.vlan_id.as_deref();

        let mut members = Vec::new();
        let mut circuit_interface: Option<&Value> = None;
        for interface in as_list(response.get("result")) {
            let Some(name) = text(interface, "/interface") else {
                continue;
            };
            let Some((_, vlan)) = name.rsplit_once('.') else {
                continue;
            };
            if circuit_interface.is_none() && wanted == Some(vlan) {
                circuit_interface = Some(interface);
            }
            members.push(vlan.to_string());
        }

        Ok(PortConfig {
            port_id: probe.device.port.clone(),
            description: circuit_interface.and_then(|i| text(i, "/description")),
            vlan_members: Some(members),
            ipv4: circuit_interface.and_then(|i| text(i, "/ipv4")),
            encapsulation: Some("dot1q".to_string()),
            ..PortConfig::default()
        })
    }
}

impl VendorDeviceAdapter for CiscoAdapter {
    fn family(&self) -> &'static str {
        match self.platform {
            CiscoPlatform::Me3400 => "cisco-me3400",
            CiscoPlatform::Asr920 => "cisco-asr920",
            CiscoPlatform::Router => "cisco-router",
        }
    }

    fn port_config(&self, probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        match self.platform {
            CiscoPlatform::Me3400 => Self::me3400(probe),
            CiscoPlatform::Asr920 => Self::asr920(probe),
            CiscoPlatform::Router => Self::router(probe),
        }
    }
}
