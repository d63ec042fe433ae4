//! Pending-Change Store
//!
//! Buffers staged entities by operation kind, then by entity type, and
//! flushes them in Insert → Update → Delete order. Within one operation,
//! types flush in the order they were first staged; within one type,
//! entities flush in staging order.

use std::collections::BTreeMap;

use crate::change_set::ChangeSet;
use crate::entity::{Entity, EntityType, Shared, StagedEntity};
use crate::errors::Result;
use crate::executor::Executor;
use crate::operation::OperationKind;
use crate::strategy::{Dispatch, FlushStrategy, StrategyRegistry};

/// Counts of what a flush executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Entities fully handled by their StoredProcEntity operation
    pub custom_handled: usize,
}

impl FlushReport {
    /// Total entities flushed
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    fn record(&mut self, operation: OperationKind, dispatch: Dispatch) {
        match operation {
            OperationKind::Insert => self.inserted += 1,
            OperationKind::Update => self.updated += 1,
            OperationKind::Delete => self.deleted += 1,
        }
        if dispatch == Dispatch::Custom {
            self.custom_handled += 1;
        }
    }
}

#[derive(Debug, Clone)]
struct TypeBucket {
    entity_type: EntityType,
    entities: Vec<StagedEntity>,
}

/// Pending writes for one unit of work
///
/// Every operation kind always has an entry; type buckets are created on
/// first staging. The store references staged entities, it never owns them.
#[derive(Debug, Clone)]
pub struct PendingChangeStore {
    buckets: BTreeMap<OperationKind, Vec<TypeBucket>>,
}

impl Default for PendingChangeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingChangeStore {
    pub fn new() -> Self {
        Self {
            buckets: OperationKind::FLUSH_ORDER
                .into_iter()
                .map(|operation| (operation, Vec::new()))
                .collect(),
        }
    }

    /// Stage `entity` for `operation`
    pub fn stage<E: Entity>(&mut self, entity: &Shared<E>, operation: OperationKind) {
        self.stage_erased(StagedEntity::new(entity), operation);
    }

    /// Stage an already type-erased entity
    pub fn stage_erased(&mut self, staged: StagedEntity, operation: OperationKind) {
        let buckets = self.buckets.entry(operation).or_default();
        let entity_type = staged.entity_type();
        match buckets.iter().position(|b| b.entity_type == entity_type) {
            Some(index) => buckets[index].entities.push(staged),
            None => buckets.push(TypeBucket {
                entity_type,
                entities: vec![staged],
            }),
        }
    }

    /// Execute every pending write against `conn`
    ///
    /// Strategies for all staged types are resolved before anything is
    /// executed. The first failing entity aborts the flush; the store is
    /// not modified either way.
    ///
    /// # Errors
    ///
    /// - `UowError::StrategyResolution` if a staged type was never registered
    /// - `UowError::EntityBorrowed` if a staged entity is borrowed by the caller
    /// - Any error raised by the executor or a custom entity operation
    pub fn flush<X>(&self, registry: &StrategyRegistry<X>, conn: &X::Conn) -> Result<FlushReport>
    where
        X: Executor + 'static,
    {
        let mut plan: Vec<(OperationKind, &TypeBucket, &dyn FlushStrategy<X>)> = Vec::new();
        for operation in OperationKind::FLUSH_ORDER {
            for bucket in self.buckets_for(operation) {
                let strategy = registry.resolve(bucket.entity_type, operation)?;
                plan.push((operation, bucket, strategy));
            }
        }

        let mut report = FlushReport::default();
        for (operation, bucket, strategy) in plan {
            tracing::debug!(
                entity_type = bucket.entity_type.name(),
                operation = operation.as_str(),
                count = bucket.entities.len(),
                "Flushing staged entities"
            );
            for staged in &bucket.entities {
                let dispatch = strategy.flush_one(registry.executor(), conn, operation, staged)?;
                report.record(operation, dispatch);
            }
        }

        Ok(report)
    }

    /// Copy out the current pending entities, one sequence per operation kind
    pub fn snapshot(&self) -> ChangeSet {
        ChangeSet::new(
            self.flatten(OperationKind::Insert),
            self.flatten(OperationKind::Update),
            self.flatten(OperationKind::Delete),
        )
    }

    /// Clear every bucket
    pub fn reset(&mut self) {
        for buckets in self.buckets.values_mut() {
            buckets.clear();
        }
    }

    /// Number of pending entities across all operation kinds
    pub fn len(&self) -> usize {
        OperationKind::FLUSH_ORDER
            .into_iter()
            .map(|operation| self.count(operation))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entities pending for `operation`
    pub fn count(&self, operation: OperationKind) -> usize {
        self.buckets_for(operation)
            .iter()
            .map(|b| b.entities.len())
            .sum()
    }

    /// Whether this exact entity instance is pending for `operation`
    pub fn contains<E: Entity>(&self, operation: OperationKind, entity: &Shared<E>) -> bool {
        let entity_type = EntityType::of::<E>();
        self.buckets_for(operation)
            .iter()
            .filter(|b| b.entity_type == entity_type)
            .any(|b| b.entities.iter().any(|staged| staged.is(entity)))
    }

    /// Entity types pending for `operation`, in first-staged order
    pub fn entity_types(&self, operation: OperationKind) -> Vec<EntityType> {
        self.buckets_for(operation)
            .iter()
            .map(|b| b.entity_type)
            .collect()
    }

    fn buckets_for(&self, operation: OperationKind) -> &[TypeBucket] {
        self.buckets
            .get(&operation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn flatten(&self, operation: OperationKind) -> Vec<StagedEntity> {
        self.buckets_for(operation)
            .iter()
            .flat_map(|b| b.entities.iter().cloned())
            .collect()
    }
}
