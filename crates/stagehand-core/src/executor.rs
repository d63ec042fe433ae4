//! Consumed collaborator contracts
//!
//! The unit of work does not execute SQL itself. It drives an [`Executor`]
//! offering generic per-type writes, inside transactions opened by a
//! [`TransactionSource`].

use crate::entity::{Entity, IdentityValue};
use crate::errors::Result;

/// A backend able to execute generic writes against a connection
pub trait Executor {
    /// The connection type writes run against (inside a transaction)
    type Conn: ?Sized + 'static;
}

/// Generic CRUD for one entity type, driven purely by the type's mapping
pub trait Crud<E: Entity>: Executor {
    /// Insert `entity`, returning the generated identity value if any
    fn insert_returning_identity(
        &self,
        conn: &Self::Conn,
        entity: &E,
    ) -> Result<Option<IdentityValue>>;

    /// Update the row matching `entity`'s primary key
    fn update_by_key(&self, conn: &Self::Conn, entity: &E) -> Result<()>;

    /// Delete the row matching `entity`'s primary key
    fn delete_by_key(&self, conn: &Self::Conn, entity: &E) -> Result<()>;
}

/// Something a transaction can be begun on
pub trait TransactionSource {
    type Conn: ?Sized + 'static;
    type Tx<'a>: TransactionHandle<Conn = Self::Conn>
    where
        Self: 'a;

    /// Begin a transaction on the underlying connection
    fn begin(&mut self) -> Result<Self::Tx<'_>>;
}

/// An open transaction
///
/// Dropping a handle without committing must roll the transaction back.
pub trait TransactionHandle {
    type Conn: ?Sized;

    /// The live transactional connection
    fn connection(&self) -> &Self::Conn;

    fn commit(self) -> Result<()>;

    fn rollback(self) -> Result<()>;
}
