//! Stagehand Store - SQLite backend for the unit of work
//!
//! Provides:
//! - `SqliteExecutor`: generic insert / update-by-key / delete-by-key for any `Table`
//! - `SqliteDatabase`: transaction source over one rusqlite connection
//! - Connection helpers and rusqlite error mapping

pub mod database;
pub mod db;
pub mod errors;
pub mod executor;
pub mod table;

pub use database::{SqliteDatabase, SqliteTransaction};
pub use errors::Result;
pub use executor::SqliteExecutor;
pub use table::Table;

/// A unit of work flushing into SQLite
pub type SqliteUnitOfWork = stagehand_core::UnitOfWork<SqliteDatabase, SqliteExecutor>;
