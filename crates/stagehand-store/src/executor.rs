//! Generic SQLite executor
//!
//! Builds insert / update-by-key / delete-by-key statements from a type's
//! [`Table`] mapping. Statements are prepared through rusqlite's statement
//! cache, so a flush of many same-typed entities reuses one statement.

#![allow(clippy::result_large_err)]

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use stagehand_core::{Crud, Entity, Executor, IdentityValue, OperationKind, Result};

use crate::errors::{column_mismatch, write_failed};
use crate::table::{Statements, Table};

/// Generic CRUD executor for every `Table` type
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteExecutor;

impl SqliteExecutor {
    pub fn new() -> Self {
        Self
    }

    fn execute<E: Table>(
        conn: &Connection,
        sql: &str,
        values: Vec<Value>,
        operation: OperationKind,
    ) -> Result<usize> {
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| write_failed(e, E::entity_name(), operation))?;
        let affected = stmt
            .execute(params_from_iter(values))
            .map_err(|e| write_failed(e, E::entity_name(), operation))?;
        Ok(affected)
    }
}

fn checked_values<E: Table>(entity: &E) -> Result<Vec<Value>> {
    let values = entity.column_values();
    if values.len() != E::COLUMNS.len() {
        return Err(column_mismatch(E::TABLE, E::COLUMNS.len(), values.len()).into());
    }
    Ok(values)
}

impl Executor for SqliteExecutor {
    type Conn = Connection;
}

impl<E: Table> Crud<E> for SqliteExecutor {
    fn insert_returning_identity(
        &self,
        conn: &Connection,
        entity: &E,
    ) -> Result<Option<IdentityValue>> {
        let values = checked_values(entity)?;

        if E::identity().is_some() {
            let sql = Statements::insert(E::TABLE, E::COLUMNS);
            Self::execute::<E>(conn, &sql, values, OperationKind::Insert)?;
            let id = conn.last_insert_rowid();
            tracing::trace!(table = E::TABLE, id = id, "Inserted row");
            return Ok(Some(id));
        }

        let mut columns = Vec::with_capacity(E::COLUMNS.len() + 1);
        columns.push(E::KEY);
        columns.extend_from_slice(E::COLUMNS);
        let mut bound = Vec::with_capacity(values.len() + 1);
        bound.push(entity.key_value());
        bound.extend(values);

        let sql = Statements::insert(E::TABLE, &columns);
        Self::execute::<E>(conn, &sql, bound, OperationKind::Insert)?;
        tracing::trace!(table = E::TABLE, "Inserted row");
        Ok(None)
    }

    fn update_by_key(&self, conn: &Connection, entity: &E) -> Result<()> {
        let Some(sql) = Statements::update(E::TABLE, E::KEY, E::COLUMNS) else {
            tracing::debug!(table = E::TABLE, "No columns to update");
            return Ok(());
        };
        let mut values = checked_values(entity)?;
        values.push(entity.key_value());

        let affected = Self::execute::<E>(conn, &sql, values, OperationKind::Update)?;
        if affected == 0 {
            tracing::warn!(
                table = E::TABLE,
                key = ?entity.key_value(),
                "Update matched no rows"
            );
        }
        Ok(())
    }

    fn delete_by_key(&self, conn: &Connection, entity: &E) -> Result<()> {
        let sql = Statements::delete(E::TABLE, E::KEY);
        let affected =
            Self::execute::<E>(conn, &sql, vec![entity.key_value()], OperationKind::Delete)?;
        if affected == 0 {
            tracing::debug!(
                table = E::TABLE,
                key = ?entity.key_value(),
                "Delete matched no rows"
            );
        }
        Ok(())
    }
}
