//! Per-type flush strategies
//!
//! Each entity type is registered once against the executor. Registration
//! decides whether the type's [`StoredProcEntity`] capability is consulted
//! before generic CRUD, so the flush never inspects entity shape.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::entity::{Entity, EntityType, StagedEntity, StoredProcEntity};
use crate::errors::{Result, UowError};
use crate::executor::{Crud, Executor};
use crate::operation::OperationKind;

/// How a single staged entity was persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The entity's own StoredProcEntity operation handled it
    Custom,
    /// The executor's generic operation ran
    Generic,
}

pub(crate) trait FlushStrategy<X: Executor> {
    fn has_custom(&self) -> bool;

    fn flush_one(
        &self,
        executor: &X,
        conn: &X::Conn,
        operation: OperationKind,
        staged: &StagedEntity,
    ) -> Result<Dispatch>;
}

struct TypedStrategy<E, X: Executor> {
    custom: Option<fn(&mut E, OperationKind, &X::Conn) -> Result<bool>>,
    _executor: PhantomData<fn(&X)>,
}

impl<E, X> FlushStrategy<X> for TypedStrategy<E, X>
where
    E: Entity,
    X: Crud<E>,
{
    fn has_custom(&self) -> bool {
        self.custom.is_some()
    }

    fn flush_one(
        &self,
        executor: &X,
        conn: &X::Conn,
        operation: OperationKind,
        staged: &StagedEntity,
    ) -> Result<Dispatch> {
        let handle = staged
            .downcast::<E>()
            .ok_or_else(|| UowError::StrategyResolution {
                entity_type: staged.entity_type().name().to_string(),
                operation,
            })?;
        let mut entity = handle
            .try_borrow_mut()
            .map_err(|_| UowError::EntityBorrowed {
                entity_type: E::entity_name().to_string(),
            })?;

        if let Some(custom) = self.custom {
            if custom(&mut *entity, operation, conn)? {
                return Ok(Dispatch::Custom);
            }
        }

        match operation {
            OperationKind::Insert => {
                let generated = executor.insert_returning_identity(conn, &*entity)?;
                if let (Some(identity), Some(value)) = (E::identity(), generated) {
                    (identity.assign)(&mut *entity, value);
                }
            }
            OperationKind::Update => executor.update_by_key(conn, &*entity)?,
            OperationKind::Delete => executor.delete_by_key(conn, &*entity)?,
        }

        Ok(Dispatch::Generic)
    }
}

fn dispatch_stored_proc<E, C>(entity: &mut E, operation: OperationKind, conn: &C) -> Result<bool>
where
    C: ?Sized,
    E: StoredProcEntity<C>,
{
    match operation {
        OperationKind::Insert => entity.execute_insert(conn),
        OperationKind::Update => entity.execute_update(conn),
        OperationKind::Delete => entity.execute_delete(conn),
    }
}

/// Registry of flush strategies, owning the generic executor
pub struct StrategyRegistry<X: Executor> {
    executor: X,
    strategies: HashMap<TypeId, Box<dyn FlushStrategy<X>>>,
}

impl<X: Executor + 'static> StrategyRegistry<X> {
    pub fn new(executor: X) -> Self {
        Self {
            executor,
            strategies: HashMap::new(),
        }
    }

    /// Register `E` for generic CRUD through the executor
    ///
    /// Only the executor is consulted for `E`, even if `E` implements
    /// [`StoredProcEntity`]; use `register_stored_proc` for that. Replacing
    /// a stored-proc registration this way logs a warning.
    pub fn register<E>(&mut self) -> &mut Self
    where
        E: Entity,
        X: Crud<E>,
    {
        self.insert_strategy::<E>(None)
    }

    /// Register `E` so its StoredProcEntity operations run before generic CRUD
    pub fn register_stored_proc<E>(&mut self) -> &mut Self
    where
        E: StoredProcEntity<X::Conn>,
        X: Crud<E>,
    {
        self.insert_strategy::<E>(Some(dispatch_stored_proc::<E, X::Conn>))
    }

    fn insert_strategy<E>(
        &mut self,
        custom: Option<fn(&mut E, OperationKind, &X::Conn) -> Result<bool>>,
    ) -> &mut Self
    where
        E: Entity,
        X: Crud<E>,
    {
        let previous = self.strategies.insert(
            TypeId::of::<E>(),
            Box::new(TypedStrategy::<E, X> {
                custom,
                _executor: PhantomData,
            }),
        );
        let replaced = previous.is_some();
        if custom.is_none() && previous.is_some_and(|p| p.has_custom()) {
            tracing::warn!(
                entity_type = E::entity_name(),
                "Stored-proc registration replaced by generic CRUD"
            );
        }
        tracing::debug!(
            entity_type = E::entity_name(),
            stored_proc = custom.is_some(),
            replaced,
            "Registered flush strategy"
        );
        self
    }

    /// Whether `E` has a registered strategy
    pub fn is_registered<E: Entity>(&self) -> bool {
        self.strategies.contains_key(&TypeId::of::<E>())
    }

    /// Whether the type was registered with the StoredProcEntity capability
    pub fn has_stored_proc(&self, entity_type: EntityType) -> bool {
        self.strategies
            .get(&entity_type.id())
            .is_some_and(|s| s.has_custom())
    }

    /// Number of registered entity types
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub(crate) fn resolve(
        &self,
        entity_type: EntityType,
        operation: OperationKind,
    ) -> Result<&dyn FlushStrategy<X>> {
        self.strategies
            .get(&entity_type.id())
            .map(|s| &**s)
            .ok_or_else(|| UowError::StrategyResolution {
                entity_type: entity_type.name().to_string(),
                operation,
            })
    }
}
