//! RAD customer premises devices.
//!
//! Ownership is read from the ingress flow named after the circuit, or failing
//! that, from an ingress flow named after the device VLAN when the VLAN is 1000 or
//! above. Units with neither are confirmed through their classifiers, which list
//! the VLANs matched on ingress.

use super::{
    DeviceCommunicationError, DuplexRate, PortConfig, Probe, VendorDeviceAdapter, as_list, text,
};
use serde_json::{Value, json};

const FLOWS: &str = "rad_flows";
const CLASSIFIERS: &str = "rad_classifiers";
const PORT_DETAILS: &str = "get-port-info-details.json";
/// Lowest VLAN whose ingress flow may be named after the VLAN instead of the circuit.
const VLAN_KEYED_FLOW_MIN: u32 = 1000;

pub struct RadAdapter;

impl RadAdapter {
    fn is_ingress(name: &str) -> bool {
        name.to_ascii_uppercase().contains("IN")
    }

    /// Matched VLANs of a classifier, given as a list or a single string.
    fn classifier_matches(classifier: &Value) -> Vec<String> {
        as_list(classifier.pointer("/properties/match"))
            .into_iter()
            .filter_map(|m| match m {
                Value::String(s) => Some(s.to_ascii_lowercase()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }

    fn classifier_lookup(probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let response = probe.run(CLASSIFIERS, Value::Null)?;
        let Some(vlan) = probe.device.vlan_id.as_deref() else {
            return Ok(PortConfig {
                port_id: probe.device.port.clone(),
                vlan_members: Some(Vec::new()),
                ..PortConfig::default()
            });
        };

        let classifier = as_list(response.get("result")).into_iter().find(|c| {
            text(c, "/label").is_some_and(|label| Self::is_ingress(&label))
                && Self::classifier_matches(c)
                    .iter()
                    .any(|m| m.split(|ch: char| !ch.is_ascii_digit()).any(|token| token == vlan))
        });

        Ok(match classifier {
            Some(c) => PortConfig {
                port_id: probe.device.port.clone(),
                description: text(c, "/label"),
                vlan_members: Some(vec![vlan.to_string()]),
                ..PortConfig::default()
            },
            None => PortConfig {
                port_id: probe.device.port.clone(),
                vlan_members: Some(Vec::new()),
                ..PortConfig::default()
            },
        })
    }
}

impl VendorDeviceAdapter for RadAdapter {
    fn family(&self) -> &'static str {
        "rad"
    }

    fn port_config(&self, probe: &Probe<'_>) -> Result<PortConfig, DeviceCommunicationError> {
        let response = probe.run(FLOWS, Value::Null)?;
        let circuit = probe.circuit_id.to_ascii_uppercase();

        let flows: Vec<(String, Option<String>)> = as_list(response.get("result"))
            .into_iter()
            .filter_map(|flow| {
                let name = text(flow, "/properties/name")?;
                Self::is_ingress(&name).then(|| (name, text(flow, "/properties/ingressPortId")))
            })
            .collect();
        let port_id = |ingress: Option<String>| {
            ingress
                .map(|id| format!("ETH PORT {id}"))
                .or_else(|| probe.device.port.clone())
        };

        if let Some((name, ingress)) = flows
            .iter()
            .find(|(name, _)| name.to_ascii_uppercase().contains(&circuit))
        {
            return Ok(PortConfig {
                port_id: port_id(ingress.clone()),
                description: Some(name.clone()),
                vlan_members: None,
                ..PortConfig::default()
            });
        }

        let vlan = probe.device.vlan_id.as_deref().map(str::trim).filter(|vlan| {
            vlan.parse::<u32>().is_ok_and(|id| id >= VLAN_KEYED_FLOW_MIN)
        });
        let keyed = vlan.and_then(|vlan| {
            flows
                .iter()
                .find(|(name, _)| name.contains(vlan))
                .map(|flow| (vlan, flow))
        });

        match keyed {
            Some((vlan, (name, ingress))) => Ok(PortConfig {
                port_id: port_id(ingress.clone()),
                description: Some(name.clone()),
                confirmed_by_vlan: true,
                vlan_members: Some(vec![vlan.to_string()]),
                ..PortConfig::default()
            }),
            None => {
                tracing::debug!(tid = %probe.device.tid, "no ingress flow names the circuit; reading classifiers");
                Self::classifier_lookup(probe)
            }
        }
    }

    fn duplex_rate(&self, probe: &Probe<'_>) -> Result<DuplexRate, DeviceCommunicationError> {
        let port = probe.port_parameter(PORT_DETAILS)?;
        let number = port
            .rsplit(|c: char| !c.is_ascii_digit())
            .find(|token| !token.is_empty())
            .ok_or_else(|| probe.failure(PORT_DETAILS, format!("no port number in {port}")))?;
        let response = probe.run(PORT_DETAILS, json!({ "port": number }))?;
        text(&response, "/result/speed")
            .or_else(|| text(&response, "/result"))
            .and_then(|s| DuplexRate::parse(&s))
            .ok_or_else(|| probe.failure(PORT_DETAILS, "no port speed reported"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::ScriptedControlPlane;
    use crate::{Device, DeviceRole, Tid, Vendor};
    use std::time::Duration;

    const CID: &str = "51.L1XX.004512..CHTR";
    const TID: &str = "AUSTTXZB1ZW";

    fn cpe() -> Device {
        let mut device = Device::new(Tid::new(TID), DeviceRole::Cpe);
        device.vendor = Vendor::Rad;
        device.model = "ETX203AX/2SFP/2UTP2SFP".into();
        device.port = Some("ETH PORT 3".into());
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
    fn ingress_flow_names_circuit() {
        let plane = ScriptedControlPlane::new().reply(
            TID,
            FLOWS,
            json!({"result": [
                {"properties": {"name": format!("{CID}_OUT"), "ingressPortId": "1"}},
                {"properties": {"name": format!("{CID}_IN"), "ingressPortId": "3"}}
            ]}),
        );
        let device = cpe();
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert_eq!(config.description, Some(format!("{CID}_IN")));
        assert_eq!(config.port_id.as_deref(), Some("ETH PORT 3"));
        assert_eq!(plane.call_log(), vec![format!("{TID} {FLOWS}")]);
    }

    #[test]
    fn ingress_flow_named_after_high_vlan() {
        let plane = ScriptedControlPlane::new().reply(
            TID,
            FLOWS,
            json!({"result": [
                {"properties": {"name": "1100_OUT", "ingressPortId": "1"}},
                {"properties": {"name": "EVC_1100_IN", "ingressPortId": "5"}}
            ]}),
        );
        let device = cpe();
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert!(config.confirmed_by_vlan);
        assert_eq!(config.description.as_deref(), Some("EVC_1100_IN"));
        assert_eq!(config.port_id.as_deref(), Some("ETH PORT 5"));
        assert_eq!(config.vlan_members, Some(vec!["1100".to_string()]));
        assert_eq!(plane.call_log(), vec![format!("{TID} {FLOWS}")]);
    }

    #[test]
    fn low_vlan_flow_name_is_not_ownership() {
        let plane = ScriptedControlPlane::new()
            .reply(TID, FLOWS, json!({"result": [{"properties": {"name": "EVC_900_IN", "ingressPortId": "5"}}]}))
            .reply(TID, CLASSIFIERS, json!({"result": []}));
        let mut device = cpe();
        device.vlan_id = Some("900".into());
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert!(!config.confirmed_by_vlan);
        assert_eq!(config.description, None);
        assert_eq!(plane.call_log(), vec![format!("{TID} {FLOWS}"), format!("{TID} {CLASSIFIERS}")]);
    }

    #[test]
    fn circuit_named_flow_wins_over_vlan_named_flow() {
        let plane = ScriptedControlPlane::new().reply(
            TID,
            FLOWS,
            json!({"result": [
                {"properties": {"name": "EVC_1100_IN", "ingressPortId": "5"}},
                {"properties": {"name": format!("{CID}_IN"), "ingressPortId": "3"}}
            ]}),
        );
        let device = cpe();
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert!(!config.confirmed_by_vlan);
        assert_eq!(config.port_id.as_deref(), Some("ETH PORT 3"));
    }

    #[test]
    fn classifier_second_lookup_confirms_vlan() {
        let plane = ScriptedControlPlane::new()
            .reply(TID, FLOWS, json!({"result": [{"properties": {"name": "mgmt_in", "ingressPortId": "1"}}]}))
            .reply(
                TID,
                CLASSIFIERS,
                json!({"result": [
                    {"label": "mgmt_out", "properties": {"match": "vlan 1100"}},
                    {"label": format!("{CID}_IN"), "properties": {"match": ["vlan 1000", "vlan 1100"]}}
                ]}),
            );
        let device = cpe();
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert_eq!(config.vlan_members, Some(vec!["1100".to_string()]));
        assert_eq!(config.description, Some(format!("{CID}_IN")));
        assert_eq!(plane.call_log().len(), 2);
    }

    #[test]
    fn no_classifier_match_reports_empty_membership() {
        let plane = ScriptedControlPlane::new()
            .reply(TID, FLOWS, json!({"result": []}))
            .reply(
                TID,
                CLASSIFIERS,
                json!({"result": [{"label": "c_in", "properties": {"match": "vlan 11000"}}]}),
            );
        let device = cpe();
        let config = RadAdapter.port_config(&probe(&device, &plane)).expect("config");
        assert_eq!(config.vlan_members, Some(Vec::new()));
        assert_eq!(config.description, None);
    }

    #[test]
    fn duplex_from_port_details() {
        let plane = ScriptedControlPlane::new().reply(
            TID,
            PORT_DETAILS,
            json!({"result": {"speed": "1000-x-full-duplex"}}),
        );
        let device = cpe();
        let rate = RadAdapter.duplex_rate(&probe(&device, &plane)).expect("rate");
        assert_eq!(rate.speed_mbps, Some(1000));
        assert!(rate.full_duplex);
        assert_eq!(plane.calls()[0].parameters, json!({"port": "3"}));
    }
}
