//! SQLite transaction source
//!
//! [`SqliteDatabase`] owns one rusqlite connection and opens the transaction
//! each commit runs in. A [`SqliteTransaction`] that is dropped without
//! `commit` rolls back.

#![allow(clippy::result_large_err)]

use std::path::Path;

use rusqlite::{Connection, Transaction};
use stagehand_core::{Result, TransactionHandle, TransactionSource};

use crate::db;
use crate::errors::from_rusqlite;

/// Transaction source over a single SQLite connection
#[derive(Debug)]
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Wrap an already configured connection
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open and configure a database file
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if the file cannot be opened or configured.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Ok(Self::new(conn))
    }

    /// Open and configure an in-memory database
    ///
    /// # Errors
    ///
    /// `ExErrorKind::Persistence` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = db::open_in_memory()?;
        db::configure(&conn)?;
        Ok(Self::new(conn))
    }

    /// The underlying connection, for reads outside the unit of work
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl TransactionSource for SqliteDatabase {
    type Conn = Connection;
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tracing::trace!("Began transaction");
        Ok(SqliteTransaction { tx })
    }
}

/// An open SQLite transaction
pub struct SqliteTransaction<'a> {
    tx: Transaction<'a>,
}

impl TransactionHandle for SqliteTransaction<'_> {
    type Conn = Connection;

    fn connection(&self) -> &Connection {
        &self.tx
    }

    fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .map_err(|e| from_rusqlite(e).with_op("commit"))?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .map_err(|e| from_rusqlite(e).with_op("rollback"))?;
        Ok(())
    }
}
