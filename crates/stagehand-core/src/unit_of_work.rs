//! Unit-of-Work facade
//!
//! The caller-facing API: stage writes and associations, then `commit()`
//! flushes them inside one transaction.
//!
//! ## Commit contract
//!
//! - Pending writes flush in Insert → Update → Delete order
//! - On success the transaction commits and the store is cleared
//! - On failure the transaction is rolled back, the error is returned
//!   unchanged and every staged entity stays pending
//! - Identity values written back during a failed flush are not undone
//!
//! ## Example
//!
//! ```
//! use stagehand_core::{
//!     shared, Crud, Entity, Executor, IdentityField, IdentityValue, Result,
//!     StrategyRegistry, TransactionHandle, TransactionSource, UnitOfWork,
//! };
//!
//! struct Note {
//!     id: i64,
//! }
//!
//! impl Entity for Note {
//!     fn identity() -> Option<IdentityField<Self>> {
//!         Some(IdentityField::new("id", |n: &mut Note, id| n.id = id))
//!     }
//! }
//!
//! struct Counter;
//!
//! impl Executor for Counter {
//!     type Conn = ();
//! }
//!
//! impl Crud<Note> for Counter {
//!     fn insert_returning_identity(&self, _: &(), _: &Note) -> Result<Option<IdentityValue>> {
//!         Ok(Some(7))
//!     }
//!     fn update_by_key(&self, _: &(), _: &Note) -> Result<()> {
//!         Ok(())
//!     }
//!     fn delete_by_key(&self, _: &(), _: &Note) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! struct NoTx;
//!
//! impl TransactionHandle for NoTx {
//!     type Conn = ();
//!     fn connection(&self) -> &() {
//!         &()
//!     }
//!     fn commit(self) -> Result<()> {
//!         Ok(())
//!     }
//!     fn rollback(self) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! struct Memory;
//!
//! impl TransactionSource for Memory {
//!     type Conn = ();
//!     type Tx<'a> = NoTx;
//!     fn begin(&mut self) -> Result<NoTx> {
//!         Ok(NoTx)
//!     }
//! }
//!
//! let mut registry = StrategyRegistry::new(Counter);
//! registry.register::<Note>();
//!
//! let mut uow = UnitOfWork::new(Memory, registry);
//! let note = shared(Note { id: 0 });
//! uow.stage_insert(&note).unwrap();
//! uow.commit().unwrap();
//!
//! assert_eq!(note.borrow().id, 7);
//! assert!(uow.peek_change_set().is_empty());
//! ```

use std::cell::RefMut;
use std::time::Instant;

use stagehand_core_types::schema::OP_COMMIT;
use stagehand_core_types::{CommitId, SessionId};

use crate::change_set::ChangeSet;
use crate::entity::{Entity, Shared};
use crate::errors::{Result, UowError};
use crate::executor::{Executor, TransactionHandle, TransactionSource};
use crate::operation::OperationKind;
use crate::options::UnitOfWorkOptions;
use crate::relationship::RelationshipRegistry;
use crate::store::{FlushReport, PendingChangeStore};
use crate::strategy::StrategyRegistry;
use crate::{log_op_end, log_op_error, log_op_start};

/// A unit-of-work session over one transaction source
///
/// Not designed for concurrent use; staging and commit are sequential.
pub struct UnitOfWork<S: TransactionSource, X: Executor> {
    source: S,
    registry: StrategyRegistry<X>,
    relationships: RelationshipRegistry,
    store: PendingChangeStore,
    options: UnitOfWorkOptions,
    session_id: SessionId,
}

impl<S, X> UnitOfWork<S, X>
where
    S: TransactionSource,
    X: Executor<Conn = S::Conn> + 'static,
{
    /// Create a session with default (unbounded) options
    pub fn new(source: S, registry: StrategyRegistry<X>) -> Self {
        Self::open(source, registry, UnitOfWorkOptions::default())
    }

    /// Create a session with explicit options
    ///
    /// # Errors
    ///
    /// `UowError::InvalidOptions` if the options fail validation
    /// (`max_pending` of zero).
    pub fn with_options(
        source: S,
        registry: StrategyRegistry<X>,
        options: UnitOfWorkOptions,
    ) -> Result<Self> {
        options.validate().map_err(UowError::InvalidOptions)?;
        Ok(Self::open(source, registry, options))
    }

    fn open(source: S, registry: StrategyRegistry<X>, options: UnitOfWorkOptions) -> Self {
        let session_id = SessionId::new();
        tracing::debug!(
            session_id = %session_id,
            max_pending = ?options.max_pending,
            "Opened unit of work"
        );
        Self {
            source,
            registry,
            relationships: RelationshipRegistry::new(),
            store: PendingChangeStore::new(),
            options,
            session_id,
        }
    }

    /// Replace the relationship registry
    pub fn with_relationships(mut self, relationships: RelationshipRegistry) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn options(&self) -> &UnitOfWorkOptions {
        &self.options
    }

    pub fn registry(&self) -> &StrategyRegistry<X> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StrategyRegistry<X> {
        &mut self.registry
    }

    pub fn relationships_mut(&mut self) -> &mut RelationshipRegistry {
        &mut self.relationships
    }

    /// The caller's transaction source (for reads outside the unit of work)
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Number of staged entities across all operation kinds
    pub fn pending_count(&self) -> usize {
        self.store.len()
    }

    /// Stage `entity` for insert
    ///
    /// # Errors
    ///
    /// `UowError::PendingLimitExceeded` if the session is full.
    pub fn stage_insert<E: Entity>(&mut self, entity: &Shared<E>) -> Result<()> {
        self.stage(entity, OperationKind::Insert)
    }

    /// Stage `entity` for update
    ///
    /// # Errors
    ///
    /// `UowError::PendingLimitExceeded` if the session is full.
    pub fn stage_update<E: Entity>(&mut self, entity: &Shared<E>) -> Result<()> {
        self.stage(entity, OperationKind::Update)
    }

    /// Stage `entity` for delete
    ///
    /// # Errors
    ///
    /// `UowError::PendingLimitExceeded` if the session is full.
    pub fn stage_delete<E: Entity>(&mut self, entity: &Shared<E>) -> Result<()> {
        self.stage(entity, OperationKind::Delete)
    }

    /// Stage each entity for delete, preserving input order
    ///
    /// Either every entity is staged or none is.
    ///
    /// # Errors
    ///
    /// `UowError::PendingLimitExceeded` if the batch does not fit.
    pub fn stage_delete_all<'a, E, I>(&mut self, entities: I) -> Result<()>
    where
        E: Entity,
        I: IntoIterator<Item = &'a Shared<E>>,
    {
        let entities: Vec<&Shared<E>> = entities.into_iter().collect();
        self.ensure_capacity(entities.len())?;
        for entity in entities {
            self.store.stage(entity, OperationKind::Delete);
        }
        Ok(())
    }

    /// Stage `child` for insert and append it to `parent`'s collection of `C`
    ///
    /// The child is staged before the relationship is resolved, so it stays
    /// pending when resolution or the parent borrow fails.
    ///
    /// # Errors
    ///
    /// - `UowError::PendingLimitExceeded` if the session is full (nothing staged)
    /// - `UowError::RelationshipNotFound` if `P` has no registered relationship to `C`
    /// - `UowError::AmbiguousRelationship` if it has several; use `stage_association_insert_as`
    /// - `UowError::EntityBorrowed` if `parent` is currently borrowed
    pub fn stage_association_insert<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
    ) -> Result<()> {
        self.associate(child, parent, None)
    }

    /// Like `stage_association_insert`, selecting the relationship by name
    ///
    /// # Errors
    ///
    /// As `stage_association_insert`, except ambiguity cannot occur.
    pub fn stage_association_insert_as<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
        relationship: &str,
    ) -> Result<()> {
        self.associate(child, parent, Some(relationship))
    }

    /// Stage `child` for delete and remove it from `parent`'s collection of `C`
    ///
    /// A child missing from the collection is not an error. As with
    /// `stage_association_insert`, the child is staged before the
    /// relationship is resolved.
    ///
    /// # Errors
    ///
    /// - `UowError::PendingLimitExceeded` if the session is full (nothing staged)
    /// - `UowError::RelationshipNotFound` if `P` has no registered relationship to `C`
    /// - `UowError::AmbiguousRelationship` if it has several; use `remove_association_as`
    /// - `UowError::EntityBorrowed` if `parent` is currently borrowed
    pub fn remove_association<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
    ) -> Result<()> {
        self.dissociate(child, parent, None)
    }

    /// Like `remove_association`, selecting the relationship by name
    ///
    /// # Errors
    ///
    /// As `remove_association`, except ambiguity cannot occur.
    pub fn remove_association_as<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
        relationship: &str,
    ) -> Result<()> {
        self.dissociate(child, parent, Some(relationship))
    }

    /// Flush every pending write in one transaction
    ///
    /// The transaction is committed before the store is reset, not after: a
    /// commit rejected by the database leaves every staged entity pending,
    /// the same as a failed flush.
    ///
    /// # Errors
    ///
    /// Whatever the transaction source, a strategy lookup, the executor or a
    /// custom entity operation raised. The transaction has been rolled back
    /// and the pending writes are still staged.
    pub fn commit(&mut self) -> Result<FlushReport> {
        let commit_id = CommitId::new();
        let start = Instant::now();
        log_op_start!(
            OP_COMMIT,
            session_id = %self.session_id,
            commit_id = %commit_id,
            pending = self.store.len()
        );

        let result = self.flush_in_transaction();
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(report) => {
                log_op_end!(
                    OP_COMMIT,
                    duration_ms = duration_ms,
                    session_id = %self.session_id,
                    commit_id = %commit_id,
                    inserted = report.inserted,
                    updated = report.updated,
                    deleted = report.deleted
                );
            }
            Err(err) => {
                log_op_error!(
                    OP_COMMIT,
                    err.clone(),
                    duration_ms = duration_ms,
                    session_id = %self.session_id,
                    commit_id = %commit_id
                );
            }
        }

        result
    }

    /// Snapshot of the pending writes
    pub fn peek_change_set(&self) -> ChangeSet {
        self.store.snapshot()
    }

    /// Discard every pending write without touching the database
    pub fn reset(&mut self) {
        tracing::debug!(
            session_id = %self.session_id,
            discarded = self.store.len(),
            "Reset unit of work"
        );
        self.store.reset();
    }

    fn flush_in_transaction(&mut self) -> Result<FlushReport> {
        let tx = self.source.begin()?;
        let flushed = self.store.flush(&self.registry, tx.connection());
        match flushed {
            Ok(report) => {
                tx.commit()?;
                self.store.reset();
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(
                        session_id = %self.session_id,
                        error = %rollback_err,
                        "Rollback failed after flush error"
                    );
                }
                Err(err)
            }
        }
    }

    fn stage<E: Entity>(&mut self, entity: &Shared<E>, operation: OperationKind) -> Result<()> {
        self.ensure_capacity(1)?;
        self.store.stage(entity, operation);
        Ok(())
    }

    fn ensure_capacity(&self, requested: usize) -> Result<()> {
        if let Some(limit) = self.options.max_pending {
            let pending = self.store.len();
            if pending + requested > limit {
                return Err(UowError::PendingLimitExceeded {
                    limit,
                    pending,
                    requested,
                });
            }
        }
        Ok(())
    }

    fn associate<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
        name: Option<&str>,
    ) -> Result<()> {
        self.stage(child, OperationKind::Insert)?;
        let relationship = self.relationships.resolve::<P, C>(name)?;
        let mut parent = borrow_parent(parent)?;
        relationship.attach(&mut *parent, child);
        Ok(())
    }

    fn dissociate<P: Entity, C: Entity>(
        &mut self,
        child: &Shared<C>,
        parent: &Shared<P>,
        name: Option<&str>,
    ) -> Result<()> {
        self.stage(child, OperationKind::Delete)?;
        let relationship = self.relationships.resolve::<P, C>(name)?;
        let mut parent = borrow_parent(parent)?;
        if !relationship.detach(&mut *parent, child) {
            tracing::debug!(
                relationship = relationship.name(),
                child_type = C::entity_name(),
                "Child not in relationship collection"
            );
        }
        Ok(())
    }
}

fn borrow_parent<P: Entity>(parent: &Shared<P>) -> Result<RefMut<'_, P>> {
    parent
        .try_borrow_mut()
        .map_err(|_| UowError::EntityBorrowed {
            entity_type: P::entity_name().to_string(),
        })
}
