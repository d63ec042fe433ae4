//! Entity capabilities
//!
//! Every stageable type implements [`Entity`]. Identity metadata and the
//! optional [`StoredProcEntity`] capability are declared per type rather
//! than discovered at flush time.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::Result;

/// Value generated by the database for an identity column
pub type IdentityValue = i64;

/// Shared handle to a caller-owned entity
///
/// Staging clones the handle, never the entity, so identity back-fill is
/// visible through every handle the caller holds.
pub type Shared<E> = Rc<RefCell<E>>;

/// Wrap an entity in a [`Shared`] handle
pub fn shared<E>(entity: E) -> Shared<E> {
    Rc::new(RefCell::new(entity))
}

/// The identity primary key of an entity type
///
/// `assign` is the only write access the flush has to a staged entity.
pub struct IdentityField<E> {
    pub column: &'static str,
    pub assign: fn(&mut E, IdentityValue),
}

impl<E> IdentityField<E> {
    pub fn new(column: &'static str, assign: fn(&mut E, IdentityValue)) -> Self {
        Self { column, assign }
    }
}

impl<E> Clone for IdentityField<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for IdentityField<E> {}

impl<E> std::fmt::Debug for IdentityField<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityField")
            .field("column", &self.column)
            .finish()
    }
}

/// A type whose instances can be staged into a unit of work
pub trait Entity: Any {
    /// Name used in logs and errors
    fn entity_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// The identity primary key, if the database generates one on insert
    fn identity() -> Option<IdentityField<Self>>
    where
        Self: Sized,
    {
        None
    }
}

/// Entity-supplied persistence logic
///
/// Each method runs against the live transactional connection and returns
/// `true` when it fully handled the write. Returning `false` falls back to
/// the executor's generic operation.
pub trait StoredProcEntity<C: ?Sized>: Entity {
    fn execute_insert(&mut self, conn: &C) -> Result<bool>;
    fn execute_update(&mut self, conn: &C) -> Result<bool>;
    fn execute_delete(&mut self, conn: &C) -> Result<bool>;
}

/// Runtime identifier of an entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    pub fn of<E: Entity>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::entity_name(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl std::hash::Hash for EntityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased reference to a staged entity
#[derive(Clone)]
pub struct StagedEntity {
    entity_type: EntityType,
    value: Rc<dyn Any>,
}

impl StagedEntity {
    pub fn new<E: Entity>(entity: &Shared<E>) -> Self {
        Self {
            entity_type: EntityType::of::<E>(),
            value: entity.clone(),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Recover the typed handle, or `None` if the entity is not an `E`
    pub fn downcast<E: Entity>(&self) -> Option<Shared<E>> {
        Rc::clone(&self.value).downcast::<RefCell<E>>().ok()
    }

    /// Whether this references the same entity instance as `entity`
    pub fn is<E: Entity>(&self, entity: &Shared<E>) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.value) as *const (),
            Rc::as_ptr(entity) as *const (),
        )
    }
}

impl std::fmt::Debug for StagedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedEntity")
            .field("entity_type", &self.entity_type.name)
            .finish_non_exhaustive()
    }
}
