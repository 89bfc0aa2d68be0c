//! # Revision State Machine
//!
//! A revision is a draft instance of a circuit or transport path, cloned from its
//! live or designed instance. Every mutation of a workflow goes through one.
//!
//! ```text
//! NONE -> CREATED -> MUTATED -> COMMITTED
//!                 \-> COMMITTED
//!          MUTATED -> ROLLED_BACK
//! ```
//!
//! Each mutation may record an undo descriptor. Rolling back replays the recorded
//! descriptors in reverse, best-effort: a failed compensation is logged and
//! returned, never retried.

use crate::inventory::{ElementQuery, InventoryError, InventoryStore, PathUpdate};
use crate::primitives::{ETHERNET_TRANSPORT_CATEGORY, LEGACY_TRANSPORT, PLANNED_STATUS};
use crate::{Bandwidth, Level, PathwiseError, RevisionState};
use std::collections::BTreeSet;

// =============================================================================
// LEDGER
// =============================================================================

/// Revision instance ids handed out during one workflow run.
#[derive(Debug, Default)]
pub struct RevisionLedger {
    issued: BTreeSet<String>,
}

impl RevisionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance id of the live or designed revision of `path_name`.
    pub fn find_parent(
        inventory: &dyn InventoryStore,
        path_name: &str,
    ) -> Result<String, PathwiseError> {
        inventory
            .path_revisions(path_name)?
            .into_iter()
            .find(|rev| rev.is_cloneable())
            .map(|rev| rev.instance_id)
            .ok_or_else(|| PathwiseError::NotFound(format!("live or designed revision of {path_name}")))
    }

    /// Clone `parent_instance_id` into a new draft.
    ///
    /// # Errors
    /// `RevisionConflict` when the inventory hands back the parent's id or an id this
    /// ledger has already seen.
    pub fn create(
        &mut self,
        inventory: &dyn InventoryStore,
        path_name: &str,
        parent_instance_id: &str,
    ) -> Result<Revision, PathwiseError> {
        let receipt = inventory.create_revision(path_name, parent_instance_id)?;
        let instance_id = receipt.path_instance_id.trim().to_string();
        if instance_id.is_empty() {
            return Err(PathwiseError::InconsistentRecord(format!(
                "revision of {path_name} returned no instance id"
            )));
        }
        if instance_id == parent_instance_id.trim() || !self.issued.insert(instance_id.clone()) {
            return Err(PathwiseError::RevisionConflict {
                parent: parent_instance_id.to_string(),
                instance: instance_id,
            });
        }

        tracing::info!(path = path_name, parent = parent_instance_id, instance = %instance_id, "revision created");
        Ok(Revision {
            path_name: path_name.to_string(),
            parent_instance_id: parent_instance_id.to_string(),
            instance_id,
            state: RevisionState::Created,
            undo: Vec::new(),
        })
    }

    pub fn issued(&self) -> impl Iterator<Item = &str> {
        self.issued.iter().map(String::as_str)
    }
}

// =============================================================================
// REVISION
// =============================================================================

/// A draft revision owned by one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    path_name: String,
    parent_instance_id: String,
    instance_id: String,
    state: RevisionState,
    undo: Vec<PathUpdate>,
}

impl Revision {
    #[must_use]
    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    #[must_use]
    pub fn parent_instance_id(&self) -> &str {
        &self.parent_instance_id
    }

    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    #[must_use]
    pub const fn state(&self) -> RevisionState {
        self.state
    }

    /// Recorded undo descriptors, oldest first.
    #[must_use]
    pub fn undo_log(&self) -> &[PathUpdate] {
        &self.undo
    }

    /// Apply an update. Added elements record their own removal as undo.
    pub fn apply(
        &mut self,
        inventory: &dyn InventoryStore,
        update: PathUpdate,
    ) -> Result<(), PathwiseError> {
        let undo = match &update {
            PathUpdate::AddElement {
                path_name,
                instance_id,
                leg_instance_id,
                sequence,
                ..
            } => Some(PathUpdate::RemoveElement {
                path_name: path_name.clone(),
                instance_id: instance_id.clone(),
                leg_instance_id: leg_instance_id.clone(),
                sequence: sequence.clone(),
            }),
            _ => None,
        };
        self.apply_with_undo(inventory, update, undo)
    }

    /// Apply an update with an explicit compensating update.
    ///
    /// # Errors
    /// - `InvalidRevisionTransition` unless the revision is CREATED or MUTATED
    /// - `InconsistentRecord` when the update targets another instance
    pub fn apply_with_undo(
        &mut self,
        inventory: &dyn InventoryStore,
        update: PathUpdate,
        undo: Option<PathUpdate>,
    ) -> Result<(), PathwiseError> {
        self.require_open("mutate")?;
        if update.instance_id() != self.instance_id {
            return Err(PathwiseError::InconsistentRecord(format!(
                "update for instance {} applied to revision {}",
                update.instance_id(),
                self.instance_id
            )));
        }
        inventory.update_path(&update)?;
        if let Some(undo) = undo {
            self.undo.push(undo);
        }
        self.state = RevisionState::Mutated;
        Ok(())
    }

    /// Remove this revision's 1 Gbps Ethernet transport leg.
    pub fn remove_legacy_transport(
        &mut self,
        inventory: &dyn InventoryStore,
    ) -> Result<(), PathwiseError> {
        self.require_open("mutate")?;
        let removal = legacy_transport_removal(inventory, &self.path_name, &self.instance_id)?;
        self.apply_with_undo(inventory, removal, None)
    }

    /// Promote the revision to the planned status.
    pub fn commit(&mut self, inventory: &dyn InventoryStore) -> Result<(), PathwiseError> {
        self.require_open("commit")?;
        inventory.update_path(&PathUpdate::Status {
            path_name: self.path_name.clone(),
            instance_id: self.instance_id.clone(),
            status: PLANNED_STATUS.to_string(),
        })?;
        self.state = RevisionState::Committed;
        tracing::info!(path = %self.path_name, instance = %self.instance_id, "revision committed");
        Ok(())
    }

    /// Replay the undo log in reverse.
    ///
    /// Returns the compensations that failed. They are logged and not retried.
    ///
    /// # Errors
    /// `InvalidRevisionTransition` unless the revision is MUTATED.
    pub fn roll_back(
        &mut self,
        inventory: &dyn InventoryStore,
    ) -> Result<Vec<PathwiseError>, PathwiseError> {
        if self.state != RevisionState::Mutated {
            return Err(PathwiseError::InvalidRevisionTransition {
                from: self.state,
                action: "roll back",
            });
        }
        let mut failures = Vec::new();
        for undo in self.undo.iter().rev() {
            if let Err(err) = inventory.update_path(undo) {
                tracing::warn!(instance = %self.instance_id, "compensation failed: {}", err);
                failures.push(err.into());
            }
        }
        self.state = RevisionState::RolledBack;
        tracing::info!(
            path = %self.path_name,
            instance = %self.instance_id,
            undone = self.undo.len(),
            failed = failures.len(),
            "revision rolled back"
        );
        Ok(failures)
    }

    fn require_open(&self, action: &'static str) -> Result<(), PathwiseError> {
        match self.state {
            RevisionState::Created | RevisionState::Mutated => Ok(()),
            from => Err(PathwiseError::InvalidRevisionTransition { from, action }),
        }
    }
}

// =============================================================================
// LEGACY TRANSPORT
// =============================================================================

/// The removal of the single 1 Gbps Ethernet transport leg of an instance.
fn legacy_transport_removal(
    inventory: &dyn InventoryStore,
    path_name: &str,
    instance_id: &str,
) -> Result<PathUpdate, PathwiseError> {
    let legacy = Bandwidth::parse(LEGACY_TRANSPORT)?;
    let elements = match inventory.path_elements(&ElementQuery::instance(instance_id, Level::Transport)) {
        Ok(elements) => elements,
        Err(InventoryError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let legs: Vec<_> = elements
        .iter()
        .filter(|e| e.category().eq_ignore_ascii_case(ETHERNET_TRANSPORT_CATEGORY))
        .filter(|e| {
            e.element_bandwidth
                .as_deref()
                .and_then(|bw| Bandwidth::parse(bw).ok())
                == Some(legacy)
        })
        .collect();

    let leg = match legs.as_slice() {
        [leg] => *leg,
        [] => {
            return Err(PathwiseError::NotFound(format!(
                "1 Gbps transport on {path_name} instance {instance_id}"
            )));
        }
        many => {
            return Err(PathwiseError::InconsistentRecord(format!(
                "{} 1 Gbps transports on {path_name} instance {instance_id}",
                many.len()
            )));
        }
    };

    let field = |value: Option<&String>, name: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PathwiseError::InconsistentRecord(format!("transport leg on {path_name} has no {name}")))
    };
    Ok(PathUpdate::RemoveElement {
        path_name: path_name.to_string(),
        instance_id: instance_id.to_string(),
        leg_instance_id: field(leg.leg_inst_id.as_ref(), "leg instance")?,
        sequence: field(leg.sequence.as_ref(), "sequence")?,
    })
}

/// Remove the 1 Gbps Ethernet transport leg of another circuit's instance.
///
/// Used for circuits sharing an upgraded transport, whose revisions this workflow
/// does not own.
pub fn remove_legacy_transport(
    inventory: &dyn InventoryStore,
    path_name: &str,
    instance_id: &str,
) -> Result<PathUpdate, PathwiseError> {
    let removal = legacy_transport_removal(inventory, path_name, instance_id)?;
    inventory.update_path(&removal)?;
    tracing::info!(path = path_name, instance = instance_id, "1 Gbps transport removed");
    Ok(removal)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathElement;
    use crate::inventory::{InMemoryInventory, Mutation, PathRevision, RevisionReceipt};

    const CID: &str = "51.L1XX.004512..CHTR";

    fn receipt(id: &str) -> RevisionReceipt {
        RevisionReceipt {
            path_instance_id: id.into(),
            path_id: Some(CID.into()),
        }
    }

    fn add(instance: &str) -> PathUpdate {
        PathUpdate::AddElement {
            path_name: CID.into(),
            instance_id: instance.into(),
            leg_instance_id: "L1".into(),
            sequence: "1".into(),
            port_instance_id: "P10".into(),
        }
    }

    fn draft(inventory: &InMemoryInventory) -> Revision {
        RevisionLedger::new()
            .create(inventory, CID, "100")
            .expect("revision")
    }

    fn leg(bandwidth: &str, category: &str, sequence: &str) -> PathElement {
        PathElement {
            path_name: CID.into(),
            element_status: "LIVE".into(),
            element_bandwidth: Some(bandwidth.into()),
            element_category: Some(category.into()),
            leg_inst_id: Some("L7".into()),
            sequence: Some(sequence.into()),
            ..PathElement::default()
        }
    }

    #[test]
    fn parent_is_live_or_designed_revision() {
        let inventory = InMemoryInventory::new().with_rows(
            "paths",
            &[CID],
            &[
                PathRevision { path_name: CID.into(), instance_id: "99".into(), path_rev: None, status: "Planned".into() },
                PathRevision { path_name: CID.into(), instance_id: "100".into(), path_rev: None, status: "Live".into() },
            ],
        );
        assert_eq!(RevisionLedger::find_parent(&inventory, CID), Ok("100".to_string()));
    }

    #[test]
    fn parent_id_returned_as_revision_is_conflict() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("100"));
        let result = RevisionLedger::new().create(&inventory, CID, "100");
        assert!(matches!(result, Err(PathwiseError::RevisionConflict { .. })));
    }

    #[test]
    fn repeated_id_is_conflict() {
        let inventory = InMemoryInventory::new()
            .with_revision(CID, receipt("101"))
            .with_revision(CID, receipt("101"));
        let mut ledger = RevisionLedger::new();
        let first = ledger.create(&inventory, CID, "100").expect("first");
        assert_eq!(first.state(), RevisionState::Created);
        let second = ledger.create(&inventory, CID, "100");
        assert_eq!(
            second.err(),
            Some(PathwiseError::RevisionConflict {
                parent: "100".into(),
                instance: "101".into()
            })
        );
        assert_eq!(ledger.issued().collect::<Vec<_>>(), vec!["101"]);
    }

    #[test]
    fn added_element_records_its_removal() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("101"));
        let mut revision = draft(&inventory);
        revision.apply(&inventory, add("101")).expect("applied");
        assert_eq!(revision.state(), RevisionState::Mutated);
        assert!(matches!(
            revision.undo_log(),
            [PathUpdate::RemoveElement { leg_instance_id, .. }] if leg_instance_id == "L1"
        ));
    }

    #[test]
    fn update_for_another_instance_is_refused() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("101"));
        let mut revision = draft(&inventory);
        let result = revision.apply(&inventory, add("100"));
        assert!(matches!(result, Err(PathwiseError::InconsistentRecord(_))));
        assert!(inventory.path_updates().is_empty());
        assert_eq!(revision.state(), RevisionState::Created);
    }

    #[test]
    fn illegal_transitions() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("101"));
        let mut revision = draft(&inventory);
        assert!(matches!(
            revision.roll_back(&inventory),
            Err(PathwiseError::InvalidRevisionTransition { from: RevisionState::Created, .. })
        ));
        revision.commit(&inventory).expect("commit from created");
        assert!(matches!(
            revision.apply(&inventory, add("101")),
            Err(PathwiseError::InvalidRevisionTransition { from: RevisionState::Committed, .. })
        ));
        assert!(revision.commit(&inventory).is_err());
    }

    #[test]
    fn commit_sets_planned_status() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("101"));
        let mut revision = draft(&inventory);
        revision.commit(&inventory).expect("commit");
        assert_eq!(
            inventory.path_updates(),
            vec![PathUpdate::Status {
                path_name: CID.into(),
                instance_id: "101".into(),
                status: "Planned".into()
            }]
        );
    }

    #[test]
    fn rollback_replays_undo_in_reverse() {
        let inventory = InMemoryInventory::new().with_revision(CID, receipt("101"));
        let mut revision = draft(&inventory);
        let old_bandwidth = PathUpdate::Bandwidth {
            path_name: CID.into(),
            instance_id: "101".into(),
            bandwidth: Bandwidth::from_gbps(1),
            new_shelf: None,
        };
        revision.apply(&inventory, add("101")).expect("add");
        revision
            .apply_with_undo(
                &inventory,
                PathUpdate::Bandwidth {
                    path_name: CID.into(),
                    instance_id: "101".into(),
                    bandwidth: Bandwidth::from_gbps(10),
                    new_shelf: None,
                },
                Some(old_bandwidth.clone()),
            )
            .expect("bandwidth");

        let failures = revision.roll_back(&inventory).expect("rollback");
        assert!(failures.is_empty());
        assert_eq!(revision.state(), RevisionState::RolledBack);
        let updates = inventory.path_updates();
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[2], old_bandwidth);
        assert!(matches!(updates[3], PathUpdate::RemoveElement { .. }));
    }

    #[test]
    fn single_legacy_leg_is_removed_from_own_instance() {
        let inventory = InMemoryInventory::new()
            .with_revision(CID, receipt("101"))
            .with_elements(
                &ElementQuery::instance("101", Level::Transport),
                &[leg("1 GBPS", "ETHERNET TRANSPORT", "2"), leg("10 Gbps", "ETHERNET TRANSPORT", "3")],
            );
        let mut revision = draft(&inventory);
        revision.remove_legacy_transport(&inventory).expect("removed");
        assert_eq!(
            inventory.journal().last(),
            Some(&Mutation::Path(PathUpdate::RemoveElement {
                path_name: CID.into(),
                instance_id: "101".into(),
                leg_instance_id: "L7".into(),
                sequence: "2".into(),
            }))
        );
    }

    #[test]
    fn legacy_leg_must_be_unique() {
        let two = InMemoryInventory::new().with_elements(
            &ElementQuery::instance("7", Level::Transport),
            &[leg("1 Gbps", "ETHERNET TRANSPORT", "1"), leg("1 Gbps", "ETHERNET TRANSPORT", "2")],
        );
        assert!(matches!(
            remove_legacy_transport(&two, "OTHER", "7"),
            Err(PathwiseError::InconsistentRecord(_))
        ));

        let none = InMemoryInventory::new().with_elements(
            &ElementQuery::instance("7", Level::Transport),
            &[leg("1 Gbps", "AGGREGATE", "1")],
        );
        assert!(matches!(
            remove_legacy_transport(&none, "OTHER", "7"),
            Err(PathwiseError::NotFound(_))
        ));
        assert!(two.journal().is_empty() && none.journal().is_empty());
    }
}
