//! # Bandwidth Upgrade
//!
//! ```text
//! product -> restricted combos -> graph -> delta -> reconcile -> transport capacity
//!   -> handoff capacity -> order vs inventory -> CPE checks -> compliance screen
//!   -> [transport revision + 1G->10G swap] -> circuit revision -> [CPE swap]
//!   -> bandwidth -> oversubscription -> commit -> access policy
//! ```
//!
//! Everything before the first revision is read-only. Once the transport revision
//! is mutated, any later failure rolls back every revision still open, circuit
//! first. Committed revisions and a submitted CPE swap are left in place.

use super::{Collaborators, EngineeringJob, UpgradeClass, WorkflowOutcome};
use crate::capacity::{TransportAssessment, bandwidth_delta};
use crate::diagnostics::Diagnostics;
use crate::graph::{CircuitRecord, Handoff};
use crate::inventory::{
    CpeSwapRequest, ElementQuery, InventoryError, InventoryStore, PathUpdate, PortUpdate,
};
use crate::primitives::{
    ASSIGNED_PORT_STATUS, CPE_SWAP_NOTE, DUPLEX_COORDINATION_NOTE, LEGACY_TRANSPORT,
    MAX_UPGRADE_MBPS, MW_HUB_IMPACTED, MW_NO_HUB_IMPACTED, MW_NOT_NEEDED, ONE_GIG_PORT_PREFIX,
    TEN_GIG_CARD_TEMPLATE, TEN_GIG_PORT_PREFIX, TYPE_TWO_MARKER, UPGRADED_TRANSPORT,
};
use crate::revision::{Revision, RevisionLedger, remove_legacy_transport};
use crate::{
    Bandwidth, Device, DeviceRole, Level, PathElement, PathwiseError, RevisionState, TransportPath,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// REQUEST
// =============================================================================

/// What the CRM order declares about the circuit. Every field is optional; only
/// supplied fields are checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetails {
    /// Usable addresses requested, as `"/29=5"` or `"/29"`.
    pub usable_ip: Option<String>,
    /// "ROUTED" or "LAN".
    pub service_type: Option<String>,
    pub ip_address: Option<String>,
    pub connector: Option<String>,
    /// "Access" or "Trunked".
    pub uni_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    pub circuit_id: String,
    pub product: String,
    pub requested: Bandwidth,
    #[serde(default)]
    pub type_two: bool,
    #[serde(default)]
    pub order: OrderDetails,
    /// Field operations confirmed the hub shelf can take a 10G optic.
    #[serde(default)]
    pub serviceable_shelf: bool,
}

impl UpgradeRequest {
    #[must_use]
    pub fn new(circuit_id: impl Into<String>, product: impl Into<String>, requested: Bandwidth) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            product: product.into(),
            requested,
            type_two: false,
            order: OrderDetails::default(),
            serviceable_shelf: false,
        }
    }
}

// =============================================================================
// PRECHECKS
// =============================================================================

/// Order value with "N/A" and dashes removed, upper-cased. `None` when blank.
fn ordered(value: Option<&str>) -> Option<String> {
    let cleaned = compact(&value?.replace("N/A", ""));
    (!cleaned.is_empty()).then_some(cleaned)
}

fn compact(value: &str) -> String {
    value.trim().replace('-', "").to_ascii_uppercase()
}

fn check_restricted(request: &UpgradeRequest) -> Result<(), PathwiseError> {
    if request.type_two || request.product.to_ascii_uppercase().contains(TYPE_TWO_MARKER) {
        return Err(PathwiseError::RestrictedCombination(
            "TYPE II circuits are unsupported for bandwidth upgrades".into(),
        ));
    }
    let ceiling = Bandwidth::from_mbps(MAX_UPGRADE_MBPS);
    if request.requested > ceiling {
        return Err(PathwiseError::RestrictedCombination(format!(
            "requested bandwidth {} is above {ceiling}",
            request.requested
        )));
    }
    Ok(())
}

fn check_handoff(order: &OrderDetails, handoff: &Handoff) -> Result<(), PathwiseError> {
    if let Some(connector) = ordered(order.connector.as_deref()) {
        let carried = handoff.connector_type.as_deref().map(compact).unwrap_or_default();
        if !carried.contains(&connector) {
            return Err(PathwiseError::RestrictedCombination(format!(
                "ordered connector {connector} is not carried by handoff port {} ({carried})",
                handoff.port
            )));
        }
    }
    if let Some(uni) = ordered(order.uni_type.as_deref()) {
        let dynamic = handoff.is_dynamic();
        if (uni == "ACCESS" && dynamic) || (uni == "TRUNKED" && !dynamic) {
            return Err(PathwiseError::RestrictedCombination(format!(
                "ordered UNI type {uni} does not match handoff port {} channelization {}",
                handoff.port,
                handoff.channelization.as_deref().unwrap_or("none")
            )));
        }
    }
    Ok(())
}

/// Address characters only: digits, dots, slashes and commas.
fn address_text(value: &str) -> String {
    value
        .replace("IPv4", "")
        .replace("IPv6", "")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | ','))
        .collect()
}

/// Compare the order's IPv4 declarations with the inventory record.
fn compare_order(order: &OrderDetails, circuit: &CircuitRecord) -> Result<(), PathwiseError> {
    let subnet = circuit.ipv4_assigned_subnet.as_deref().unwrap_or_default().trim();
    let gateway = circuit.ipv4_gateway.as_deref().unwrap_or_default().trim();
    let mismatch = |field: &str, ordered: &str, recorded: &str| PathwiseError::CrossSystemMismatch {
        field: field.to_string(),
        ordered: ordered.to_string(),
        recorded: recorded.to_string(),
    };

    if let Some(usable) = order.usable_ip.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let ordered_prefix = usable.split('=').next().unwrap_or_default().replace('/', "");
        let recorded_prefix = subnet.rsplit('/').next().unwrap_or_default();
        if ordered_prefix.trim() != recorded_prefix.trim() {
            return Err(mismatch("IPv4 subnet prefix", usable, subnet));
        }
    }

    if let Some(service) = order.service_type.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let recorded = circuit.ipv4_service_type.as_deref().unwrap_or_default().trim();
        if !service.eq_ignore_ascii_case(recorded) {
            return Err(mismatch("IPv4 service type", service, recorded));
        }
    }

    if let Some(address) = order.ip_address.as_deref() {
        let address = address_text(address);
        if !address.is_empty() && !subnet.contains(&address) && !gateway.contains(&address) {
            return Err(mismatch("IPv4 address", &address, subnet));
        }
    }
    Ok(())
}

/// The CPE must be a supported vendor, reachable, and its handoff speed known.
fn check_cpe(
    collab: &Collaborators<'_>,
    cpe: &Device,
    circuit_id: &str,
    current: Bandwidth,
    requested: Bandwidth,
    diagnostics: &mut Diagnostics,
) -> Result<(), PathwiseError> {
    if !collab.config.supports_cpe_vendor(&cpe.vendor) {
        return Err(PathwiseError::UnsupportedVendor {
            vendor: cpe.vendor.to_string(),
            model: cpe.model.clone(),
        });
    }
    collab.engine().ensure_active(cpe)?;
    if collab
        .planner()
        .duplex_change_required(cpe, circuit_id, current, requested, diagnostics)?
    {
        diagnostics.note(DUPLEX_COORDINATION_NOTE);
    }
    Ok(())
}

// =============================================================================
// TRANSPORT SWAP
// =============================================================================

fn required<'e>(value: Option<&'e str>, what: &str, path: &str) -> Result<&'e str, PathwiseError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PathwiseError::InconsistentRecord(format!("uplink on {path} has no {what}")))
}

/// The single port of the upstream device on a transport revision.
fn uplink<'e>(elements: &'e [PathElement], path: &TransportPath) -> Result<&'e PathElement, PathwiseError> {
    let upstream = path.upstream_tid();
    let found: Vec<&PathElement> = elements
        .iter()
        .filter(|e| upstream.is_some() && e.tid() == upstream)
        .collect();
    match found.as_slice() {
        [one] => Ok(*one),
        other => Err(PathwiseError::InconsistentRecord(format!(
            "{} uplink ports on {}",
            other.len(),
            path.path_id
        ))),
    }
}

/// `GE-0/0/1` becomes `XE-0/0/1`.
fn ten_gig_access_id(access_id: &str) -> String {
    let trimmed = access_id.trim();
    match trimmed.get(..ONE_GIG_PORT_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(ONE_GIG_PORT_PREFIX) => {
            format!("{TEN_GIG_PORT_PREFIX}{}", &trimmed[ONE_GIG_PORT_PREFIX.len()..])
        }
        _ => trimmed.to_string(),
    }
}

/// Replace the 1G uplink of `path` with a 10G one inside a new transport revision.
///
/// On a hub path the uplink keeps its port and the optic card is swapped; otherwise
/// the uplink moves to a spare 10G port on the same device.
fn upgrade_transport(
    collab: &Collaborators<'_>,
    ledger: &mut RevisionLedger,
    path: &TransportPath,
    hub: bool,
) -> Result<Revision, PathwiseError> {
    let inventory = collab.inventory;
    let mut revision = ledger.create(inventory, &path.path_id, &path.path_instance_id)?;
    let instance = revision.instance_id().to_string();

    let elements =
        inventory.path_elements(&ElementQuery::instance(&instance, Level::Transport))?;
    let uplink_port = uplink(&elements, path)?;
    let leg = required(uplink_port.leg_inst_id.as_deref(), "leg instance", &path.path_id)?;
    let sequence = required(uplink_port.sequence.as_deref(), "sequence", &path.path_id)?;
    let old_port = required(uplink_port.port_inst_id.as_deref(), "port instance", &path.path_id)?;

    let add = |port_instance_id: &str| PathUpdate::AddElement {
        path_name: path.path_id.clone(),
        instance_id: instance.clone(),
        leg_instance_id: leg.to_string(),
        sequence: sequence.to_string(),
        port_instance_id: port_instance_id.to_string(),
    };
    let remove = PathUpdate::RemoveElement {
        path_name: path.path_id.clone(),
        instance_id: instance.clone(),
        leg_instance_id: leg.to_string(),
        sequence: sequence.to_string(),
    };

    let new_port = if hub {
        let equipment = required(
            uplink_port.element_name.as_deref().or(uplink_port.tid.as_deref()),
            "equipment",
            &path.path_id,
        )?;
        let slot_name = required(uplink_port.slot.as_deref(), "slot", &path.path_id)?;
        let access_id = required(uplink_port.port_access_id.as_deref(), "port access id", &path.path_id)?;

        revision.apply_with_undo(inventory, remove, Some(add(old_port)))?;

        let single_slot = || -> Result<_, PathwiseError> {
            let mut slots = inventory.equipment_slots(equipment, slot_name)?;
            if slots.len() != 1 {
                return Err(PathwiseError::InconsistentRecord(format!(
                    "{} slots named {slot_name} on {equipment}",
                    slots.len()
                )));
            }
            Ok(slots.remove(0))
        };
        let slot = single_slot()?;
        inventory.delete_card(&slot)?;
        inventory.insert_card(&slot, TEN_GIG_CARD_TEMPLATE)?;
        let rebuilt = single_slot()?;
        let port = required(rebuilt.port_inst_id.as_deref(), "port on the new card", &path.path_id)?
            .to_string();
        inventory.update_port(&PortUpdate {
            port_instance_id: port.clone(),
            status: ASSIGNED_PORT_STATUS.to_string(),
            access_id: ten_gig_access_id(access_id),
        })?;
        tracing::info!(path = %path.path_id, equipment, slot = slot_name, "hub optic card swapped");
        port
    } else {
        let upstream = path.upstream_tid().ok_or_else(|| {
            PathwiseError::InconsistentRecord(format!("no upstream device on {}", path.path_id))
        })?;
        let ports = match inventory.available_ports(&upstream, UPGRADED_TRANSPORT) {
            Ok(ports) => ports,
            Err(InventoryError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        let port = ports
            .into_iter()
            .next()
            .map(|p| p.port_inst_id)
            .ok_or_else(|| PathwiseError::NoAvailablePort {
                tid: upstream.to_string(),
                rate: UPGRADED_TRANSPORT.to_string(),
            })?;
        revision.apply_with_undo(inventory, remove, Some(add(old_port)))?;
        port
    };
    revision.apply(inventory, add(&new_port))?;

    let previous = if path.bandwidth_nominal == Bandwidth::ZERO {
        Bandwidth::parse(LEGACY_TRANSPORT)?
    } else {
        path.bandwidth_nominal
    };
    let bandwidth = |bandwidth| PathUpdate::Bandwidth {
        path_name: path.path_id.clone(),
        instance_id: instance.clone(),
        bandwidth,
        new_shelf: None,
    };
    revision.apply_with_undo(
        inventory,
        bandwidth(Bandwidth::parse(UPGRADED_TRANSPORT)?),
        Some(bandwidth(previous)),
    )?;
    tracing::info!(path = %path.path_id, instance = %instance, hub, "transport upgraded to 10G");
    Ok(revision)
}

/// Drop the 1G transport leg of every other circuit riding the upgraded transport.
fn clear_sibling_transports(
    collab: &Collaborators<'_>,
    circuit_id: &str,
    transport: &str,
) -> Result<usize, PathwiseError> {
    let channels = match collab.inventory.channels_in_use(transport) {
        Ok(channels) => channels,
        Err(InventoryError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let mut cleared = 0;
    for channel in channels.iter().filter(|c| c.member_path.trim() != circuit_id) {
        let (Some(next_path), Some(next_instance)) =
            (channel.next_path.as_deref(), channel.next_inst_id.as_deref())
        else {
            tracing::debug!(member = %channel.member_path, "channel without next path skipped");
            continue;
        };
        remove_legacy_transport(collab.inventory, next_path, next_instance)?;
        cleared += 1;
    }
    Ok(cleared)
}

/// Read-only inputs of the circuit half of an upgrade.
struct CircuitPlan<'p> {
    circuit_id: &'p str,
    request: &'p UpgradeRequest,
    current: Bandwidth,
    delta: Bandwidth,
    handoff: &'p Handoff,
    cpe: &'p Device,
    /// Replacement model and the transport it rides, when the CPE is swapped.
    swap: Option<(String, &'p TransportPath)>,
    assessment: &'p TransportAssessment,
}

/// Clone the circuit, swap the CPE, move the circuit to the new rate and commit.
///
/// The circuit revision lands in `circuit_revision` as soon as it exists. Returns
/// its instance id.
fn record_circuit(
    collab: &Collaborators<'_>,
    plan: &CircuitPlan<'_>,
    ledger: &mut RevisionLedger,
    circuit_revision: &mut Option<Revision>,
    mut transport_revision: Option<&mut Revision>,
    diagnostics: &mut Diagnostics,
) -> Result<String, PathwiseError> {
    let inventory = collab.inventory;
    let circuit_id = plan.circuit_id;
    let parent = RevisionLedger::find_parent(inventory, circuit_id)?;
    let revision = circuit_revision.insert(ledger.create(inventory, circuit_id, &parent)?);

    if let Some((model, path)) = &plan.swap {
        let swap = CpeSwapRequest {
            circuit_id: circuit_id.to_string(),
            circuit_instance_id: revision.instance_id().to_string(),
            device: plan.handoff.tid.clone(),
            vendor: plan.cpe.vendor.to_string(),
            model: model.clone(),
            transport_path: path.path_id.clone(),
        };
        inventory.swap_cpe(&swap)?;
        diagnostics.note(CPE_SWAP_NOTE);
        let cleared = clear_sibling_transports(collab, circuit_id, &path.path_id)?;
        tracing::info!(circuit = circuit_id, device = %plan.handoff.tid, cleared, "CPE swap submitted");
    }

    if transport_revision.is_some() {
        revision.remove_legacy_transport(inventory)?;
    }
    let bandwidth = |bandwidth| PathUpdate::Bandwidth {
        path_name: circuit_id.to_string(),
        instance_id: revision.instance_id().to_string(),
        bandwidth,
        new_shelf: None,
    };
    let (raise, restore) = (bandwidth(plan.request.requested), bandwidth(plan.current));
    revision.apply_with_undo(inventory, raise, Some(restore))?;

    let planner = collab.planner();
    for (path, utilization) in &plan.assessment.aggregates {
        planner.apply_oversubscription(path, utilization, plan.delta)?;
    }

    revision.commit(inventory)?;
    if let Some(transport) = transport_revision.as_deref_mut() {
        transport.commit(inventory)?;
    }
    collab
        .gate()
        .assign_policy(circuit_id, revision.instance_id(), &plan.request.product)?;
    Ok(revision.instance_id().to_string())
}

/// Roll back every revision still open, in the order given.
///
/// Committed and untouched revisions are left as they are and logged. Failed
/// compensations are recorded as tolerated.
fn roll_back_open<'r>(
    inventory: &dyn InventoryStore,
    revisions: impl Iterator<Item = &'r mut Revision>,
    diagnostics: &mut Diagnostics,
) {
    for revision in revisions {
        if revision.state() != RevisionState::Mutated {
            tracing::warn!(
                path = revision.path_name(),
                instance = revision.instance_id(),
                state = ?revision.state(),
                "revision left in place"
            );
            continue;
        }
        match revision.roll_back(inventory) {
            Ok(failures) => failures.iter().for_each(|f| diagnostics.tolerated(f)),
            Err(err) => diagnostics.tolerated(&err),
        }
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

/// Plan and record a bandwidth upgrade.
///
/// # Errors
/// Any failed gate aborts the request. See the module docs for the order.
pub fn upgrade(
    collab: &Collaborators<'_>,
    request: &UpgradeRequest,
    diagnostics: &mut Diagnostics,
) -> Result<WorkflowOutcome, PathwiseError> {
    let inventory = collab.inventory;
    let circuit_id = request.circuit_id.trim();

    if !collab.config.supports_product(&request.product) {
        return Err(PathwiseError::UnsupportedProduct(request.product.clone()));
    }
    check_restricted(request)?;

    let graph = collab.load_graph(circuit_id)?;
    let handoff = graph.handoff().ok_or_else(|| {
        PathwiseError::InconsistentRecord(format!("{circuit_id} has no handoff port"))
    })?;
    check_handoff(&request.order, handoff)?;

    let current = graph.circuit().bandwidth.ok_or_else(|| {
        PathwiseError::InconsistentRecord(format!("{circuit_id} has no recorded bandwidth"))
    })?;
    let delta = bandwidth_delta(request.requested, current)?;
    tracing::info!(circuit = circuit_id, %current, requested = %request.requested, %delta, "bandwidth upgrade");

    let verdict = collab.reconcile(&graph, false, diagnostics)?;

    let planner = collab.planner();
    let assessment = planner.assess_transport(&graph.transport_paths(), delta)?;
    let short = assessment.insufficient.as_ref();
    let cpe_swap = planner.handoff_needs_swap(handoff, request.requested, short.is_some())?;
    if cpe_swap && short.is_none() {
        return Err(PathwiseError::NoAvailablePort {
            tid: handoff.tid.to_string(),
            rate: request.requested.to_string(),
        });
    }

    compare_order(&request.order, graph.circuit())?;

    let cpe = graph
        .first_with_role(DeviceRole::Cpe)
        .ok_or(PathwiseError::MissingDevice(DeviceRole::Cpe))?;
    check_cpe(collab, cpe, circuit_id, current, request.requested, diagnostics)?;
    let swap_model = if cpe_swap {
        let model = collab.config.swap_model(&cpe.vendor).ok_or_else(|| {
            PathwiseError::UnsupportedVendor {
                vendor: cpe.vendor.to_string(),
                model: cpe.model.clone(),
            }
        })?;
        Some(model.to_string())
    } else {
        None
    };

    let compliance = collab.gate().screen(graph.circuit())?;
    if compliance.blacklisted {
        return Err(PathwiseError::Ineligible(format!(
            "{} is blacklisted",
            compliance.hit.as_deref().unwrap_or(circuit_id)
        )));
    }

    // Mutations start here.
    let mut ledger = RevisionLedger::new();
    let mut hub_work_required = false;
    let mut transport_revision = None;
    if let Some(path) = short {
        let decision = planner.evaluate_hub_upgrade(path, request.serviceable_shelf, diagnostics)?;
        if !decision.eligible {
            return Err(PathwiseError::Ineligible(
                decision.reason.unwrap_or_else(|| format!("{} cannot be upgraded", path.path_id)),
            ));
        }
        hub_work_required = decision.hub_work_required;
        transport_revision = Some(upgrade_transport(collab, &mut ledger, path, hub_work_required)?);
    }

    let plan = CircuitPlan {
        circuit_id,
        request,
        current,
        delta,
        handoff,
        cpe,
        swap: swap_model.zip(short),
        assessment: &assessment,
    };
    let mut circuit_revision = None;
    let recorded = record_circuit(
        collab,
        &plan,
        &mut ledger,
        &mut circuit_revision,
        transport_revision.as_mut(),
        diagnostics,
    );

    let instance_id = match recorded {
        Ok(instance_id) => instance_id,
        Err(err) => {
            let open = [circuit_revision.as_mut(), transport_revision.as_mut()];
            roll_back_open(inventory, open.into_iter().flatten(), diagnostics);
            return Err(err);
        }
    };

    let class = if short.is_some() {
        UpgradeClass::TransportUpgradeWithCpeSwap
    } else {
        UpgradeClass::InPlace
    };
    let maintenance_window = match (short.is_some(), hub_work_required) {
        (true, true) => MW_HUB_IMPACTED,
        (true, false) => MW_NO_HUB_IMPACTED,
        (false, _) => MW_NOT_NEEDED,
    };
    tracing::info!(circuit = circuit_id, ?class, instance = %instance_id, "upgrade planned");

    Ok(WorkflowOutcome {
        verdict,
        job: EngineeringJob::Upgrade(class),
        hub_work_required,
        cpe_installer_needed: cpe_swap,
        maintenance_window: maintenance_window.to_string(),
        notes: diagnostics.notes(),
        compliance: Some(compliance),
        revision_instance_id: Some(instance_id),
        bandwidth: request.requested,
    })
}

// =============================================================================
// TESTS
// =============================================================================
