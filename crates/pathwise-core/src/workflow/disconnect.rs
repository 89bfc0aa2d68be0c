//! # Disconnect
//!
//! Classifies a disconnect as FULL or PARTIAL and reconciles what is being torn
//! down. A CPE that still carries another customer circuit makes it PARTIAL.
//!
//! On a FULL disconnect the CPE is leaving anyway, so a CPE that cannot be queried
//! is tolerated. Blacklist hits are reported in the outcome and never abort:
//! releasing listed addresses is what a disconnect should do.

use super::{Collaborators, EngineeringJob, WorkflowOutcome};
use crate::diagnostics::Diagnostics;
use crate::inventory::InventoryError;
use crate::primitives::{ACTIVE_MTU_SITE, MW_NOT_NEEDED};
use crate::{Bandwidth, DeviceRole, PathwiseError};
use std::collections::BTreeSet;

/// Classify and reconcile a disconnect of `circuit_id`.
///
/// # Errors
/// - graph errors from the element listing
/// - `ReconciliationFailed` when a queried device disagrees with the inventory
/// - `ComplianceService` when the blacklist cannot be reached
pub fn disconnect(
    collab: &Collaborators<'_>,
    circuit_id: &str,
    diagnostics: &mut Diagnostics,
) -> Result<WorkflowOutcome, PathwiseError> {
    let circuit_id = circuit_id.trim();
    let graph = collab.load_graph(circuit_id)?;
    let cpe = graph
        .first_with_role(DeviceRole::Cpe)
        .ok_or(PathwiseError::MissingDevice(DeviceRole::Cpe))?;

    let riding = match collab.inventory.equipment_circuits(&cpe.tid) {
        Ok(circuits) => circuits,
        Err(InventoryError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let others: BTreeSet<&str> = riding
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && *c != circuit_id)
        .collect();
    let full = others.is_empty();

    let verdict = collab.reconcile(&graph, full, diagnostics)?;

    let (job, hub_work_required, cpe_installer_needed) = if full {
        let active_mtu = graph
            .circuit()
            .z_site_type
            .as_deref()
            .is_some_and(|site| site.trim().eq_ignore_ascii_case(ACTIVE_MTU_SITE));
        (
            EngineeringJob::FullDisconnect,
            !active_mtu,
            collab.config.needs_installer(&cpe.model),
        )
    } else {
        diagnostics.note(format!(
            "{} other circuit(s) remain on {}",
            others.len(),
            cpe.tid
        ));
        (EngineeringJob::PartialDisconnect, false, false)
    };

    let compliance = collab.gate().screen(graph.circuit())?;
    tracing::info!(
        circuit = circuit_id,
        ?job,
        hub_work_required,
        blacklisted = compliance.blacklisted,
        "disconnect classified"
    );

    Ok(WorkflowOutcome {
        verdict,
        job,
        hub_work_required,
        cpe_installer_needed,
        maintenance_window: MW_NOT_NEEDED.to_string(),
        notes: diagnostics.notes(),
        compliance: Some(compliance),
        revision_instance_id: None,
        bandwidth: Bandwidth::ZERO,
    })
}
