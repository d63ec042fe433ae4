//! Relational mapping for entities
//!
//! A [`Table`] describes how one entity type maps onto one SQLite table:
//! the table name, the key column and the remaining columns in a fixed
//! order. [`crate::SqliteExecutor`] builds its statements from this.

use rusqlite::types::Value;
use stagehand_core::Entity;

/// Mapping of an entity type onto a single table
///
/// When the entity has identity metadata the key column is generated by
/// SQLite on insert; otherwise the key is written from [`Table::key_value`].
pub trait Table: Entity {
    /// Table name
    const TABLE: &'static str;

    /// Primary key column
    const KEY: &'static str;

    /// Every non-key column, in the order `column_values` returns them
    const COLUMNS: &'static [&'static str];

    /// Current value of the key column
    fn key_value(&self) -> Value;

    /// Current values of `COLUMNS`
    fn column_values(&self) -> Vec<Value>;
}

/// Statement text for one `Table`
pub(crate) struct Statements;

impl Statements {
    pub(crate) fn insert(table: &str, columns: &[&str]) -> String {
        if columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", table);
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// `None` when there is nothing to set
    pub(crate) fn update(table: &str, key: &str, columns: &[&str]) -> Option<String> {
        if columns.is_empty() {
            return None;
        }
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        Some(format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table,
            assignments.join(", "),
            key,
            columns.len() + 1
        ))
    }

    pub(crate) fn delete(table: &str, key: &str) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", table, key)
    }
}
