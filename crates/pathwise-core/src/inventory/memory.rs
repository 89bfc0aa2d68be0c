//! In-memory inventory backend.
//!
//! Holds recorded inventory responses as raw JSON and serves them through
//! [`decode_records`], so fixtures exercise the same "no records" handling a live
//! backend would. Every mutation is journaled in call order.

use super::{
    ChannelAssignment, CpeSwapRequest, ElementQuery, EquipmentPort, EquipmentSlot,
    InventoryError, InventoryStore, PathRevision, PathUpdate, PathUpdateReceipt,
    PathUtilization, PolicyAssignment, PortUpdate, RevisionReceipt, decode_records,
};
use crate::{PathElement, Tid};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A journaled write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateRevision { path_name: String, parent: String },
    Path(PathUpdate),
    Port(PortUpdate),
    DeleteCard(EquipmentSlot),
    InsertCard { slot: EquipmentSlot, template: String },
    SwapCpe(CpeSwapRequest),
    AssignPolicy(PolicyAssignment),
}

/// Inventory backed by recorded responses.
///
/// Fixtures are keyed by operation name and arguments. A lookup with no fixture
/// answers like the real inventory does: with the "no records" message.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    fixtures: BTreeMap<String, Value>,
    revisions: RefCell<BTreeMap<String, VecDeque<RevisionReceipt>>>,
    receipts: BTreeMap<String, PathUpdateReceipt>,
    failing: BTreeSet<&'static str>,
    journal: RefCell<Vec<Mutation>>,
}

fn key(operation: &str, args: &[&str]) -> String {
    let mut key = operation.to_string();
    for arg in args {
        key.push('|');
        key.push_str(arg);
    }
    key
}

impl InMemoryInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw response for `operation` called with `args`.
    #[must_use]
    pub fn with_fixture(mut self, operation: &str, args: &[&str], body: Value) -> Self {
        self.fixtures.insert(key(operation, args), body);
        self
    }

    /// Record typed rows for `operation` called with `args`.
    #[must_use]
    pub fn with_rows<T: Serialize>(self, operation: &str, args: &[&str], rows: &[T]) -> Self {
        let body = serde_json::to_value(rows).unwrap_or(Value::Null);
        self.with_fixture(operation, args, body)
    }

    #[must_use]
    pub fn with_elements(self, query: &ElementQuery, elements: &[PathElement]) -> Self {
        let described = query.describe();
        self.with_rows("pathElements", &[&described], elements)
    }

    /// Queue the receipt returned by the next revision of `path_name`.
    #[must_use]
    pub fn with_revision(self, path_name: &str, receipt: RevisionReceipt) -> Self {
        self.revisions
            .borrow_mut()
            .entry(path_name.to_string())
            .or_default()
            .push_back(receipt);
        self
    }

    /// Receipt returned by path updates on `path_name`.
    #[must_use]
    pub fn with_update_receipt(mut self, path_name: &str, receipt: PathUpdateReceipt) -> Self {
        self.receipts.insert(path_name.to_string(), receipt);
        self
    }

    /// Make every call of `operation` fail with a transport error.
    #[must_use]
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Writes made so far, in call order.
    #[must_use]
    pub fn journal(&self) -> Vec<Mutation> {
        self.journal.borrow().clone()
    }

    /// Path updates made so far, in call order.
    #[must_use]
    pub fn path_updates(&self) -> Vec<PathUpdate> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|m| match m {
                Mutation::Path(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    fn check(&self, operation: &'static str) -> Result<(), InventoryError> {
        if self.failing.contains(operation) {
            return Err(InventoryError::Transport {
                operation: operation.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn rows<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> Result<Vec<T>, InventoryError> {
        self.check(operation)?;
        let key = key(operation, args);
        let body = self
            .fixtures
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Value::String("No records found".to_string()));
        decode_records(&key, body)
    }

    fn record(&self, operation: &'static str, mutation: Mutation) -> Result<(), InventoryError> {
        self.check(operation)?;
        self.journal.borrow_mut().push(mutation);
        Ok(())
    }
}

impl InventoryStore for InMemoryInventory {
    fn path_elements(&self, query: &ElementQuery) -> Result<Vec<PathElement>, InventoryError> {
        self.rows("pathElements", &[&query.describe()])
    }

    fn path_utilization(
        &self,
        path_name: &str,
        instance_id: &str,
    ) -> Result<Vec<PathUtilization>, InventoryError> {
        self.rows("pathUtilization", &[path_name, instance_id])
    }

    fn channels_in_use(&self, path_name: &str) -> Result<Vec<ChannelAssignment>, InventoryError> {
        self.rows("pathChanAvailability", &[path_name])
    }

    fn path_revisions(&self, path_name: &str) -> Result<Vec<PathRevision>, InventoryError> {
        self.rows("paths", &[path_name])
    }

    fn create_revision(
        &self,
        path_name: &str,
        parent_instance_id: &str,
    ) -> Result<RevisionReceipt, InventoryError> {
        self.record(
            "createRevision",
            Mutation::CreateRevision {
                path_name: path_name.to_string(),
                parent: parent_instance_id.to_string(),
            },
        )?;
        self.revisions
            .borrow_mut()
            .get_mut(path_name)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| InventoryError::NotFound(format!("revision of {path_name}")))
    }

    fn update_path(&self, update: &PathUpdate) -> Result<PathUpdateReceipt, InventoryError> {
        self.record("updatePath", Mutation::Path(update.clone()))?;
        Ok(self
            .receipts
            .get(update.path_name())
            .cloned()
            .unwrap_or_else(|| PathUpdateReceipt {
                path_id: Some(update.path_name().to_string()),
                path_instance_id: Some(update.instance_id().to_string()),
            }))
    }

    fn update_port(&self, update: &PortUpdate) -> Result<(), InventoryError> {
        self.record("updatePort", Mutation::Port(update.clone()))
    }

    fn equipment_slots(
        &self,
        equipment: &str,
        slot: &str,
    ) -> Result<Vec<EquipmentSlot>, InventoryError> {
        self.rows("equipmentSlots", &[equipment, slot])
    }

    fn delete_card(&self, slot: &EquipmentSlot) -> Result<(), InventoryError> {
        self.record("deleteCard", Mutation::DeleteCard(slot.clone()))
    }

    fn insert_card(&self, slot: &EquipmentSlot, template: &str) -> Result<(), InventoryError> {
        self.record(
            "insertCard",
            Mutation::InsertCard {
                slot: slot.clone(),
                template: template.to_string(),
            },
        )
    }

    fn available_ports(
        &self,
        tid: &Tid,
        bandwidth: &str,
    ) -> Result<Vec<EquipmentPort>, InventoryError> {
        self.rows("availablePorts", &[tid.as_str(), bandwidth])
    }

    fn equipment_circuits(&self, tid: &Tid) -> Result<Vec<String>, InventoryError> {
        self.rows("equipmentCircuits", &[tid.as_str()])
    }

    fn attribute_values(
        &self,
        instance_id: &str,
        attribute: &str,
    ) -> Result<Vec<String>, InventoryError> {
        self.rows("attributes", &[instance_id, attribute])
    }

    fn swap_cpe(&self, request: &CpeSwapRequest) -> Result<(), InventoryError> {
        self.record("swapCpe", Mutation::SwapCpe(request.clone()))
    }

    fn assign_policy(&self, assignment: &PolicyAssignment) -> Result<(), InventoryError> {
        self.record("assignPolicy", Mutation::AssignPolicy(assignment.clone()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use serde_json::json;

    #[test]
    fn missing_fixture_reads_as_not_found() {
        let inventory = InMemoryInventory::new();
        let result = inventory.path_utilization("31001.GE1.A.B", "1");
        assert!(matches!(result, Err(InventoryError::NotFound(_))));
    }

    #[test]
    fn elements_round_trip_through_fixtures() {
        let query = ElementQuery::instance("42", Level::Transport);
        let element = PathElement {
            path_name: "CID".into(),
            element_status: "LIVE".into(),
            ..PathElement::default()
        };
        let inventory = InMemoryInventory::new().with_elements(&query, &[element.clone()]);
        let rows = inventory.path_elements(&query).expect("fixture present");
        assert_eq!(rows, vec![element]);
    }

    #[test]
    fn injected_failure_is_transport_error() {
        let inventory = InMemoryInventory::new().failing("updatePath");
        let update = PathUpdate::Status {
            path_name: "CID".into(),
            instance_id: "1".into(),
            status: "Planned".into(),
        };
        assert!(matches!(
            inventory.update_path(&update),
            Err(InventoryError::Transport { .. })
        ));
        assert!(inventory.journal().is_empty());
    }

    #[test]
    fn revisions_are_handed_out_in_order() {
        let inventory = InMemoryInventory::new()
            .with_revision("CID", RevisionReceipt { path_instance_id: "2".into(), path_id: None })
            .with_revision("CID", RevisionReceipt { path_instance_id: "3".into(), path_id: None });
        let first = inventory.create_revision("CID", "1").expect("first");
        let second = inventory.create_revision("CID", "1").expect("second");
        assert_eq!((first.path_instance_id.as_str(), second.path_instance_id.as_str()), ("2", "3"));
        assert!(inventory.create_revision("CID", "1").is_err());
        assert_eq!(inventory.journal().len(), 3);
    }

    #[test]
    fn raw_sentinel_fixture() {
        let inventory = InMemoryInventory::new().with_fixture(
            "pathChanAvailability",
            &["T1"],
            json!({"retString": "No records found"}),
        );
        assert!(matches!(
            inventory.channels_in_use("T1"),
            Err(InventoryError::NotFound(_))
        ));
    }
}
