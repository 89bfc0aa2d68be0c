//! # Topology Benchmarks
//!
//! Performance benchmarks for graph construction and the pure helpers it leans on.
//!
//! Run with: `cargo bench -p pathwise-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pathwise_core::{
    Bandwidth, ElementType, Level, PathElement, PathGraphBuilder, RoleClassifier, Tid,
};
use std::hint::black_box;

const CIRCUIT: &str = "51.L1XX.004512..CHTR";
const HUB: &str = "AUSTTXGR1CW";
const CPE: &str = "AUSTTXZB1ZW";

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

/// A circuit running from the hub through `hops` muxes to the CPE, one transport
/// link per hop.
fn create_chain_listing(hops: usize) -> Vec<PathElement> {
    let mut tids = vec![HUB.to_string()];
    tids.extend((0..hops).map(|i| format!("AUSTTX{i:03}AW")));
    tids.push(CPE.to_string());

    let mut elements = Vec::new();
    for (i, pair) in tids.windows(2).enumerate() {
        let mut link = element(Level::Transport, CIRCUIT, ElementType::Path, None);
        link.element_name = Some(format!("{}.GE1.{}.{}", 31000 + i, pair[0], pair[1]));
        link.element_reference = Some(format!("{}", 200 + i));
        elements.push(link);
    }

    let mut hub = element(Level::Transport, CIRCUIT, ElementType::Port, Some(HUB));
    hub.port_access_id = Some("GE-0/0/0".into());
    hub.vendor = Some("JUNIPER".into());
    elements.push(hub);

    for (i, tid) in tids[1..tids.len() - 1].iter().enumerate() {
        let mut mux = element(Level::Transport, CIRCUIT, ElementType::Port, Some(tid));
        mux.port_access_id = Some(format!("GE-0/0/{}", i + 1));
        mux.vendor = Some("ADVA".into());
        elements.push(mux);
    }

    let mut cpe = element(Level::Transport, CIRCUIT, ElementType::Port, Some(CPE));
    cpe.port_access_id = Some("ETH PORT 3".into());
    cpe.vendor = Some("RAD".into());
    cpe.channel = Some("VLAN1100".into());
    cpe.bandwidth = Some("500 Mbps".into());
    elements.push(cpe);

    elements
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    for hops in [1, 10, 100].iter() {
        let elements = create_chain_listing(*hops);

        group.bench_with_input(BenchmarkId::from_parameter(hops), &elements, |b, elements| {
            b.iter(|| black_box(PathGraphBuilder::build(CIRCUIT, elements)));
        });
    }

    group.finish();
}

fn bench_role_classify(c: &mut Criterion) {
    let tids: Vec<Tid> = ["AUSTTXGR1CW", "AUSTTXGR2QW", "AUSTTX001AW", "AUSTTXZB1ZW"]
        .iter()
        .map(Tid::new)
        .collect();

    c.bench_function("role_classify", |b| {
        b.iter(|| {
            for tid in &tids {
                black_box(RoleClassifier::classify(tid, Level::Transport, None));
            }
        });
    });
}

fn bench_bandwidth_parse(c: &mut Criterion) {
    let inputs = ["500 Mbps", "1 Gbps", "10/100/1000", "1.5 Gbps", "100M"];

    c.bench_function("bandwidth_parse", |b| {
        b.iter(|| {
            for input in &inputs {
                let _ = black_box(Bandwidth::parse(input));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_graph_build,
    bench_role_classify,
    bench_bandwidth_parse,
);
criterion_main!(benches);
