//! Point-in-time view of pending changes

use crate::entity::{Entity, Shared, StagedEntity};
use crate::operation::OperationKind;

/// Snapshot of everything pending, flattened across entity types
///
/// Holds its own copies of the staged handles, so later staging or a reset
/// of the store does not change a ChangeSet already taken.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    inserts: Vec<StagedEntity>,
    updates: Vec<StagedEntity>,
    deletes: Vec<StagedEntity>,
}

impl ChangeSet {
    pub fn new(
        inserts: Vec<StagedEntity>,
        updates: Vec<StagedEntity>,
        deletes: Vec<StagedEntity>,
    ) -> Self {
        Self {
            inserts,
            updates,
            deletes,
        }
    }

    pub fn inserts(&self) -> &[StagedEntity] {
        &self.inserts
    }

    pub fn updates(&self) -> &[StagedEntity] {
        &self.updates
    }

    pub fn deletes(&self) -> &[StagedEntity] {
        &self.deletes
    }

    /// Pending entities for one operation kind
    pub fn get(&self, operation: OperationKind) -> &[StagedEntity] {
        match operation {
            OperationKind::Insert => &self.inserts,
            OperationKind::Update => &self.updates,
            OperationKind::Delete => &self.deletes,
        }
    }

    /// Typed handles of the `E` entities pending for `operation`, in staging order
    pub fn of<E: Entity>(&self, operation: OperationKind) -> Vec<Shared<E>> {
        self.get(operation)
            .iter()
            .filter_map(StagedEntity::downcast::<E>)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
