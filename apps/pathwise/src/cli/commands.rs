//! # CLI Command Implementations
//!
//! Each command builds a serializable report first and prints it second, so the
//! reports can be checked without capturing stdout.

use crate::config::{read_bounded, render_config};
use pathwise_core::capacity::{bandwidth_delta, crosses_duplex_threshold};
use pathwise_core::inventory::decode_records;
use pathwise_core::{Bandwidth, DeviceRole, EngineConfig, PathElement, PathGraphBuilder, PathwiseError};
use serde::Serialize;
use std::path::Path;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a pathElements dump (50 MB).
const MAX_DUMP_FILE_SIZE: u64 = 50 * 1024 * 1024;

fn print_json<T: Serialize>(value: &T) -> Result<(), PathwiseError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| PathwiseError::InvalidInput(format!("Cannot render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// One device of an inspected graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRow {
    pub tid: String,
    pub role: DeviceRole,
    pub vendor: String,
    pub port: Option<String>,
    pub vlan: Option<String>,
    pub transport: Option<String>,
}

/// Topology summary of one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub circuit: String,
    pub bandwidth: Option<String>,
    pub vlan: Option<String>,
    pub has_hub: bool,
    pub has_agg: bool,
    pub has_mux: bool,
    pub has_cpe: bool,
    pub devices: Vec<DeviceRow>,
    pub transport_paths: Vec<String>,
}

/// Build the graph of the dump at `file`.
///
/// The circuit id defaults to the path name of the first element.
pub fn inspect_report(file: &Path, circuit: Option<&str>) -> Result<InspectReport, PathwiseError> {
    let contents = read_bounded(file, MAX_DUMP_FILE_SIZE)?;
    let body: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
        PathwiseError::InvalidInput(format!("Invalid JSON in '{}': {}", file.display(), e))
    })?;
    let elements: Vec<PathElement> = decode_records(&file.display().to_string(), body)?;

    let circuit_id = match circuit {
        Some(id) => id.trim().to_string(),
        None => elements
            .first()
            .map(|e| e.path_name.trim().to_string())
            .ok_or_else(|| PathwiseError::InvalidInput("dump holds no elements".into()))?,
    };

    let graph = PathGraphBuilder::build(&circuit_id, &elements)?;
    tracing::debug!(
        circuit = %circuit_id,
        devices = graph.device_count(),
        links = graph.link_count(),
        "dump inspected"
    );

    Ok(InspectReport {
        bandwidth: graph.circuit().bandwidth.map(|bw| bw.to_string()),
        vlan: graph.circuit().vlan.clone(),
        has_hub: graph.has_hub(),
        has_agg: graph.has_agg(),
        has_mux: graph.has_mux(),
        has_cpe: graph.has_cpe(),
        devices: graph
            .devices()
            .map(|d| DeviceRow {
                tid: d.tid.to_string(),
                role: d.role,
                vendor: d.vendor.to_string(),
                port: d.port.clone(),
                vlan: d.vlan_id.clone(),
                transport: d.transport.clone(),
            })
            .collect(),
        transport_paths: graph
            .transport_paths()
            .into_iter()
            .map(|p| p.path_id)
            .collect(),
        circuit: circuit_id,
    })
}

/// Print the topology of a pathElements dump.
pub fn cmd_inspect(file: &Path, circuit: Option<&str>, json_mode: bool) -> Result<(), PathwiseError> {
    let report = inspect_report(file, circuit)?;

    if json_mode {
        return print_json(&report);
    }

    println!("Circuit {}", report.circuit);
    println!("==================");
    println!(
        "Bandwidth: {}",
        report.bandwidth.as_deref().unwrap_or("unknown")
    );
    println!("VLAN:      {}", report.vlan.as_deref().unwrap_or("none"));
    println!(
        "Roles:     hub={} agg={} mux={} cpe={}",
        report.has_hub, report.has_agg, report.has_mux, report.has_cpe
    );
    println!();
    for device in &report.devices {
        println!(
            "  {:<4} {:<12} {:<8} port={} vlan={}",
            device.role.to_string(),
            device.tid,
            device.vendor,
            device.port.as_deref().unwrap_or("-"),
            device.vlan.as_deref().unwrap_or("-")
        );
    }
    if !report.transport_paths.is_empty() {
        println!();
        println!("Transport paths:");
        for path in &report.transport_paths {
            println!("  {}", path);
        }
    }

    Ok(())
}

// =============================================================================
// BANDWIDTH COMMAND
// =============================================================================

/// Outcome of checking one bandwidth change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandwidthReport {
    pub current: String,
    pub requested: String,
    pub delta: Option<String>,
    /// Code and message when the change is not an upgrade.
    pub rejection: Option<(u16, String)>,
    pub crosses_duplex_threshold: bool,
}

/// Parse comma-separated thresholds in Mbps.
fn parse_thresholds(text: &str) -> Result<Vec<u64>, PathwiseError> {
    let thresholds = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| PathwiseError::InvalidInput(format!("invalid threshold '{}'", t)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(PathwiseError::InvalidInput(
            "thresholds must be strictly ascending".into(),
        ));
    }
    Ok(thresholds)
}

/// Normalize `current` and `requested` and check the change between them.
///
/// Thresholds fall back to the configured ones when not given.
pub fn bandwidth_report(
    config: &EngineConfig,
    current: &str,
    requested: &str,
    thresholds: Option<&str>,
) -> Result<BandwidthReport, PathwiseError> {
    let current = Bandwidth::parse(current)?;
    let requested = Bandwidth::parse(requested)?;
    let thresholds = match thresholds {
        Some(text) => parse_thresholds(text)?,
        None => config.duplex_thresholds_mbps.clone(),
    };

    let (delta, rejection) = match bandwidth_delta(requested, current) {
        Ok(delta) => (Some(delta.to_string()), None),
        Err(e) => (None, Some((e.code(), e.to_string()))),
    };

    Ok(BandwidthReport {
        current: current.to_string(),
        requested: requested.to_string(),
        delta,
        rejection,
        crosses_duplex_threshold: crosses_duplex_threshold(
            &thresholds,
            current.mbps(),
            requested.mbps(),
        ),
    })
}

/// Print the bandwidth check.
pub fn cmd_bandwidth(
    config: &EngineConfig,
    current: &str,
    requested: &str,
    thresholds: Option<&str>,
    json_mode: bool,
) -> Result<(), PathwiseError> {
    let report = bandwidth_report(config, current, requested, thresholds)?;

    if json_mode {
        return print_json(&report);
    }

    println!("Current:   {}", report.current);
    println!("Requested: {}", report.requested);
    match (&report.delta, &report.rejection) {
        (Some(delta), _) => println!("Delta:     {}", delta),
        (None, Some((code, message))) => println!("Rejected:  [{}] {}", code, message),
        (None, None) => {}
    }
    println!(
        "Duplex:    {}",
        if report.crosses_duplex_threshold {
            "threshold crossed"
        } else {
            "no change"
        }
    );

    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration.
pub fn cmd_config(config: &EngineConfig, json_mode: bool) -> Result<(), PathwiseError> {
    if json_mode {
        return print_json(config);
    }
    print!("{}", render_config(config)?);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
