//! Association descriptors
//!
//! A [`Relationship`] names one collection-valued field on a parent type and
//! how to reach it. Descriptors are registered once per relationship; the
//! unit of work resolves them by (parent type, child type) when staging
//! associations.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::entity::{Entity, Shared};
use crate::errors::{Result, UowError};

/// Accessor for a parent's child collection; `None` means not yet loaded
pub type CollectionAccessor<P, C> = fn(&mut P) -> &mut Option<Vec<Shared<C>>>;

/// A collection-valued relationship from `P` to `C`
pub struct Relationship<P, C> {
    name: &'static str,
    accessor: CollectionAccessor<P, C>,
}

impl<P, C> Clone for Relationship<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for Relationship<P, C> {}

impl<P, C> std::fmt::Debug for Relationship<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relationship")
            .field("name", &self.name)
            .finish()
    }
}

impl<P: Entity, C: Entity> Relationship<P, C> {
    pub fn new(name: &'static str, accessor: CollectionAccessor<P, C>) -> Self {
        Self { name, accessor }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append `child` to the parent's collection, creating it if absent
    pub fn attach(&self, parent: &mut P, child: &Shared<C>) {
        (self.accessor)(parent)
            .get_or_insert_with(Vec::new)
            .push(Rc::clone(child));
    }

    /// Remove `child` from the parent's collection
    ///
    /// Returns whether the child was present.
    pub fn detach(&self, parent: &mut P, child: &Shared<C>) -> bool {
        match (self.accessor)(parent) {
            Some(children) if !children.is_empty() => {
                match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                    Some(index) => {
                        children.remove(index);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

/// Registered relationships keyed by (parent type, child type)
#[derive(Default)]
pub struct RelationshipRegistry {
    entries: HashMap<(TypeId, TypeId), Vec<Box<dyn Any>>>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relationship, replacing one with the same name
    pub fn register<P: Entity, C: Entity>(&mut self, relationship: Relationship<P, C>) -> &mut Self {
        let entries = self
            .entries
            .entry((TypeId::of::<P>(), TypeId::of::<C>()))
            .or_default();
        entries.retain(|existing| {
            existing
                .downcast_ref::<Relationship<P, C>>()
                .map_or(true, |r| r.name != relationship.name)
        });
        entries.push(Box::new(relationship));
        self
    }

    /// Every relationship registered from `P` to `C`, in registration order
    pub fn candidates<P: Entity, C: Entity>(&self) -> Vec<Relationship<P, C>> {
        self.entries
            .get(&(TypeId::of::<P>(), TypeId::of::<C>()))
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.downcast_ref::<Relationship<P, C>>().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve the single relationship from `P` to `C`
    ///
    /// With `name`, exactly that relationship is selected.
    ///
    /// # Errors
    ///
    /// - `UowError::RelationshipNotFound` if nothing matches
    /// - `UowError::AmbiguousRelationship` if several match and no name was given
    pub fn resolve<P: Entity, C: Entity>(&self, name: Option<&str>) -> Result<Relationship<P, C>> {
        let candidates = self.candidates::<P, C>();
        let not_found = || UowError::RelationshipNotFound {
            parent_type: P::entity_name().to_string(),
            child_type: C::entity_name().to_string(),
        };

        if let Some(name) = name {
            return candidates
                .into_iter()
                .find(|r| r.name == name)
                .ok_or_else(not_found);
        }

        match candidates.as_slice() {
            [] => Err(not_found()),
            [only] => Ok(*only),
            _ => Err(UowError::AmbiguousRelationship {
                parent_type: P::entity_name().to_string(),
                child_type: C::entity_name().to_string(),
                candidates: candidates.iter().map(|r| r.name.to_string()).collect(),
            }),
        }
    }
}
