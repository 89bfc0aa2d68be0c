//! # Property-Based Tests
//!
//! Invariants of the pure parts of the engine: rate arithmetic, role
//! classification, port ownership and graph construction.

use pathwise_core::capacity::{
    bandwidth_delta, crosses_duplex_threshold, handoff_capacity, oversubscription_percent,
};
use pathwise_core::graph::PathGraph;
use pathwise_core::{
    Bandwidth, DeviceRole, ElementType, Level, PathElement, PathGraphBuilder, PathwiseError,
    RoleClassifier, Tid,
};
use proptest::prelude::*;

fn circuit(vlan: u16, mbps: u64) -> Vec<PathElement> {
    let circuit = "51.L1XX.004512..CHTR";
    let transport = "31001.GE1.AUSTTXGR1CW.AUSTTXZB1ZW";
    let base = |level, path: &str, kind, tid: Option<&str>| PathElement {
        level,
        path_name: path.into(),
        path_instance_id: Some("100".into()),
        element_type: kind,
        element_status: "LIVE".into(),
        tid: tid.map(str::to_string),
        ..PathElement::default()
    };

    let mut link = base(Level::Transport, circuit, ElementType::Path, None);
    link.element_name = Some(transport.into());
    link.element_reference = Some("200".into());

    let mut hub = base(Level::Service, transport, ElementType::Port, Some("AUSTTXGR1CW"));
    hub.leg_name = Some(format!("AE17/AE17.{vlan}"));
    hub.vendor = Some("JUNIPER".into());

    let mut cpe = base(Level::Transport, circuit, ElementType::Port, Some("AUSTTXZB1ZW"));
    cpe.port_access_id = Some("ETH PORT 3".into());
    cpe.vendor = Some("RAD".into());
    cpe.channel = Some(format!("VLAN{vlan}"));
    cpe.bandwidth = Some(format!("{mbps} Mbps"));

    vec![link, hub, cpe]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Formatting a rate and parsing it back gives the same rate.
    #[test]
    fn bandwidth_display_parses_back(bps in 0u64..10_000_000_000_000) {
        let bandwidth = Bandwidth::from_bps(bps);
        let text = bandwidth.to_string();
        prop_assert_eq!(Bandwidth::parse(&text), Ok(bandwidth));
    }

    /// Whole-unit spellings parse to the scaled value, in any letter case.
    #[test]
    fn unit_spellings_scale(value in 0u64..100_000, unit in prop::sample::select(vec![
        ("Kbps", 1_000u64), ("MBPS", 1_000_000), ("gbps", 1_000_000_000), ("M", 1_000_000),
    ])) {
        let parsed = Bandwidth::parse(&format!("{value} {}", unit.0));
        prop_assert_eq!(parsed, Ok(Bandwidth::from_bps(value * unit.1)));
    }

    /// A delta exists only for real increases, and adds back up to the request.
    #[test]
    fn delta_only_for_increases(current in 0u64..100_000, requested in 0u64..100_000) {
        let (cur, req) = (Bandwidth::from_mbps(current), Bandwidth::from_mbps(requested));
        match bandwidth_delta(req, cur) {
            Ok(delta) => {
                prop_assert!(requested > current);
                prop_assert_eq!(cur.saturating_add(delta), req);
            }
            Err(PathwiseError::BandwidthUnchanged(_)) => prop_assert_eq!(requested, current),
            Err(PathwiseError::BandwidthDowngrade { .. }) => prop_assert!(requested < current),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// A larger request never needs a smaller delta.
    #[test]
    fn delta_monotonic_in_request(current in 0u64..10_000, step in 1u64..10_000, more in 1u64..10_000) {
        let cur = Bandwidth::from_mbps(current);
        let near = bandwidth_delta(Bandwidth::from_mbps(current + step), cur);
        let far = bandwidth_delta(Bandwidth::from_mbps(current + step + more), cur);
        prop_assert!(matches!((near, far), (Ok(n), Ok(f)) if f > n));
    }

    /// Oversubscription comes in 10% steps and always covers the shortfall.
    #[test]
    fn oversubscription_covers_shortfall(
        total in 1u64..1_000_000_000_000,
        used_share in 0u64..=100,
        circuit in 0u64..1_000_000_000_000,
    ) {
        let used = total / 100 * used_share;
        let available = total - used;
        let percent = oversubscription_percent(total, used, available, circuit);
        prop_assert!(percent.is_some());
        let percent = percent.unwrap_or_default();
        prop_assert_eq!(percent % 10, 0);

        let needed = u128::from(circuit) + u128::from(used);
        if u128::from(available) > needed {
            prop_assert_eq!(percent, 0);
        } else {
            let shortfall = needed.saturating_sub(u128::from(total));
            prop_assert!(u128::from(percent) * u128::from(total) > shortfall * 100);
        }
    }

    /// No crossing above 1000 Mbps, and never when the rate does not go up.
    #[test]
    fn duplex_crossing_bounds(current in 0u64..5_000, requested in 0u64..5_000) {
        let thresholds = [10, 100, 1000];
        let crosses = crosses_duplex_threshold(&thresholds, current, requested);
        if requested > 1000 || requested <= current {
            prop_assert!(!crosses);
        }
    }

    /// A composite handoff rating is as fast as its fastest token.
    #[test]
    fn composite_rating_takes_maximum(rates in prop::collection::vec(1u64..100_000, 2..5)) {
        let rating = rates.iter().map(u64::to_string).collect::<Vec<_>>().join("/");
        let fastest = rates.iter().copied().max().unwrap_or_default();
        prop_assert_eq!(handoff_capacity(&rating), Some(Bandwidth::from_mbps(fastest)));
    }

    /// The two-letter suffix decides the role, whatever the case of the input.
    #[test]
    fn role_follows_suffix(
        site in "[A-Z]{6}[A-Z0-9]{3}",
        suffix in prop::sample::select(vec!["CW", "QW", "ZW", "AW"]),
    ) {
        let upper = format!("{site}{suffix}");
        let role = RoleClassifier::classify(&Tid::new(&upper), Level::Transport, None);
        let expected = match suffix {
            "CW" => DeviceRole::Hub,
            "QW" => DeviceRole::Agg,
            "ZW" => DeviceRole::Cpe,
            _ => DeviceRole::Mux,
        };
        prop_assert_eq!(role, Some(expected));

        let lower = Tid::new(upper.to_ascii_lowercase());
        prop_assert_eq!(RoleClassifier::classify(&lower, Level::Transport, None), role);
    }

    /// Classification is a pure function of its inputs.
    #[test]
    fn classification_repeatable(site in "[A-Z]{6}[A-Z0-9]{5}", service in any::<bool>()) {
        let tid = Tid::new(&site);
        let level = if service { Level::Service } else { Level::Transport };
        let path = Some("51001.GE1.AUSTTXGR3AW.AUSTTXZB1ZW");
        let first = RoleClassifier::classify(&tid, level, path);
        prop_assert_eq!(RoleClassifier::classify(&tid, level, path), first);
    }

    /// A port can belong to one link only, however often that link claims it.
    #[test]
    fn second_link_on_a_port_rejected(port in 0u32..48, repeats in 1usize..5) {
        let mut graph = PathGraph::default();
        let tid = Tid::new("AUSTTXGR2QW");
        let port = format!("GE-0/0/{port}");
        for _ in 0..repeats {
            prop_assert!(graph.attach_port(&tid, &port, "LINK-A").is_ok());
        }
        let rejected = graph.attach_port(&tid, &port, "LINK-B");
        prop_assert!(
            matches!(rejected, Err(PathwiseError::MultiplyLinkedPort { .. })),
            "expected MultiplyLinkedPort"
        );
    }

    /// Building the same listing twice gives the same graph.
    #[test]
    fn builds_are_deterministic(vlan in 1u16..4095, mbps in 1u64..10_000) {
        let elements = circuit(vlan, mbps);
        let first = PathGraphBuilder::build("51.L1XX.004512..CHTR", &elements);
        let second = PathGraphBuilder::build("51.L1XX.004512..CHTR", &elements);
        prop_assert!(first.is_ok());
        let (first, second) = (first.unwrap_or_default(), second.unwrap_or_default());

        prop_assert_eq!(first.sor_devices(), second.sor_devices());
        prop_assert_eq!(first.transport_paths(), second.transport_paths());
        prop_assert_eq!(first.circuit(), second.circuit());
        prop_assert_eq!(first.circuit().vlan.clone(), Some(vlan.to_string()));
        prop_assert_eq!(first.circuit().bandwidth, Some(Bandwidth::from_mbps(mbps)));
    }
}
