//! Shared fixtures: a customers / orders / tags schema and the entities
//! mapped onto it.

#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::Connection;
use stagehand_core::{
    Entity, IdentityField, Result, Shared, StoredProcEntity, StrategyRegistry, UnitOfWork,
};
use stagehand_store::{SqliteDatabase, SqliteExecutor, SqliteUnitOfWork, Table};

pub const SCHEMA: &str = "
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reference TEXT NOT NULL,
        total INTEGER NOT NULL
    );
    CREATE TABLE tags (
        name TEXT PRIMARY KEY,
        colour TEXT
    );
    CREATE TABLE audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message TEXT NOT NULL,
        source TEXT NOT NULL
    );
";

// ===== Entities =====

#[derive(Debug)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub orders: Option<Vec<Shared<Order>>>,
}

impl Customer {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            orders: None,
        }
    }
}

impl Entity for Customer {
    fn entity_name() -> &'static str {
        "Customer"
    }

    fn identity() -> Option<IdentityField<Self>> {
        Some(IdentityField::new("id", |c: &mut Customer, id| c.id = id))
    }
}

impl Table for Customer {
    const TABLE: &'static str = "customers";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn key_value(&self) -> Value {
        Value::Integer(self.id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }
}

pub fn customer_orders(customer: &mut Customer) -> &mut Option<Vec<Shared<Order>>> {
    &mut customer.orders
}

#[derive(Debug)]
pub struct Order {
    pub id: i64,
    pub reference: String,
    pub total: i64,
}

impl Order {
    pub fn new(reference: &str, total: i64) -> Self {
        Self {
            id: 0,
            reference: reference.to_string(),
            total,
        }
    }
}

impl Entity for Order {
    fn entity_name() -> &'static str {
        "Order"
    }

    fn identity() -> Option<IdentityField<Self>> {
        Some(IdentityField::new("id", |o: &mut Order, id| o.id = id))
    }
}

impl Table for Order {
    const TABLE: &'static str = "orders";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["reference", "total"];

    fn key_value(&self) -> Value {
        Value::Integer(self.id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.reference.clone()),
            Value::Integer(self.total),
        ]
    }
}

/// Natural-key entity: no identity metadata
#[derive(Debug)]
pub struct Tag {
    pub name: String,
    pub colour: Option<String>,
}

impl Entity for Tag {
    fn entity_name() -> &'static str {
        "Tag"
    }
}

impl Table for Tag {
    const TABLE: &'static str = "tags";
    const KEY: &'static str = "name";
    const COLUMNS: &'static [&'static str] = &["colour"];

    fn key_value(&self) -> Value {
        Value::Text(self.name.clone())
    }

    fn column_values(&self) -> Vec<Value> {
        vec![self.colour.clone().map_or(Value::Null, Value::Text)]
    }
}

/// Writes itself on insert; update and delete go through the executor
#[derive(Debug)]
pub struct AuditRecord {
    pub id: i64,
    pub message: String,
}

impl AuditRecord {
    pub fn new(message: &str) -> Self {
        Self {
            id: 0,
            message: message.to_string(),
        }
    }
}

impl Entity for AuditRecord {
    fn entity_name() -> &'static str {
        "AuditRecord"
    }

    fn identity() -> Option<IdentityField<Self>> {
        Some(IdentityField::new("id", |a: &mut AuditRecord, id| a.id = id))
    }
}

impl Table for AuditRecord {
    const TABLE: &'static str = "audit_log";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["message", "source"];

    fn key_value(&self) -> Value {
        Value::Integer(self.id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.message.clone()),
            Value::Text("generic".to_string()),
        ]
    }
}

impl StoredProcEntity<Connection> for AuditRecord {
    fn execute_insert(&mut self, conn: &Connection) -> Result<bool> {
        conn.execute(
            "INSERT INTO audit_log (message, source) VALUES (?1, 'custom')",
            [&self.message],
        )
        .map_err(stagehand_store::errors::from_rusqlite)?;
        self.id = conn.last_insert_rowid();
        Ok(true)
    }

    fn execute_update(&mut self, _conn: &Connection) -> Result<bool> {
        Ok(false)
    }

    fn execute_delete(&mut self, _conn: &Connection) -> Result<bool> {
        Ok(false)
    }
}

// ===== Setup =====

/// In-memory database with the fixture schema
pub fn setup_test_db() -> SqliteDatabase {
    let database = SqliteDatabase::open_in_memory().unwrap();
    database.connection().execute_batch(SCHEMA).unwrap();
    database
}

pub fn registry() -> StrategyRegistry<SqliteExecutor> {
    let mut registry = StrategyRegistry::new(SqliteExecutor::new());
    registry
        .register::<Customer>()
        .register::<Order>()
        .register::<Tag>()
        .register_stored_proc::<AuditRecord>();
    registry
}

pub fn unit_of_work(database: SqliteDatabase) -> SqliteUnitOfWork {
    UnitOfWork::new(database, registry())
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}
