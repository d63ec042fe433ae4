//! Stagehand Core - change-tracking unit of work
//!
//! This crate provides the backend-agnostic unit-of-work layer:
//! - Pending-Change Store batching staged entities by operation and type
//! - Per-type flush strategies (generic CRUD or entity-supplied logic)
//! - Unit-of-Work facade with transactional commit and association staging
//! - Error and logging facilities shared with backend crates

pub mod change_set;
pub mod entity;
pub mod errors;
pub mod executor;
pub mod logging_facility;
pub mod operation;
pub mod options;
pub mod relationship;
pub mod store;
pub mod strategy;
pub mod unit_of_work;

pub use stagehand_core_types as core_types;

// Re-export commonly used types
pub use change_set::ChangeSet;
pub use entity::{
    shared, Entity, EntityType, IdentityField, IdentityValue, Shared, StagedEntity,
    StoredProcEntity,
};
pub use errors::{ExError, ExErrorKind, Result, UowError};
pub use executor::{Crud, Executor, TransactionHandle, TransactionSource};
pub use operation::OperationKind;
pub use options::UnitOfWorkOptions;
pub use relationship::{Relationship, RelationshipRegistry};
pub use store::{FlushReport, PendingChangeStore};
pub use strategy::{Dispatch, StrategyRegistry};
pub use unit_of_work::UnitOfWork;
