//! Shared fixtures: a recording executor and an in-memory transaction source
//! that write every call into one journal.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stagehand_core::{
    Crud, Entity, ExError, ExErrorKind, Executor, IdentityField, IdentityValue, Result, Shared,
    StoredProcEntity, StrategyRegistry, TransactionHandle, TransactionSource, UnitOfWork,
};

pub type Journal = Rc<RefCell<Vec<String>>>;

/// Connection handed to executors and custom entity operations
#[derive(Clone)]
pub struct FakeConn {
    pub journal: Journal,
}

impl FakeConn {
    pub fn record(&self, line: impl Into<String>) {
        self.journal.borrow_mut().push(line.into());
    }
}

/// Something the recording executor can name in the journal
pub trait Labelled {
    fn label(&self) -> String;
}

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

impl Labelled for Customer {
    fn label(&self) -> String {
        format!("Customer {}", self.name)
    }
}

pub fn customer_orders(customer: &mut Customer) -> &mut Option<Vec<Shared<Order>>> {
    &mut customer.orders
}

#[derive(Debug)]
pub struct Order {
    pub id: i64,
    pub reference: String,
}

impl Order {
    pub fn new(reference: &str) -> Self {
        Self {
            id: 0,
            reference: reference.to_string(),
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

impl Labelled for Order {
    fn label(&self) -> String {
        format!("Order {}", self.reference)
    }
}

/// Entity with no identity column
#[derive(Debug)]
pub struct Tag {
    pub name: String,
}

impl Entity for Tag {
    fn entity_name() -> &'static str {
        "Tag"
    }
}

impl Labelled for Tag {
    fn label(&self) -> String {
        format!("Tag {}", self.name)
    }
}

/// Entity with its own persistence logic
#[derive(Debug)]
pub struct AuditEntry {
    pub id: i64,
    pub message: String,
    /// What the custom operations report back
    pub handles: bool,
}

impl AuditEntry {
    pub fn new(message: &str, handles: bool) -> Self {
        Self {
            id: 0,
            message: message.to_string(),
            handles,
        }
    }
}

impl Entity for AuditEntry {
    fn entity_name() -> &'static str {
        "AuditEntry"
    }

    fn identity() -> Option<IdentityField<Self>> {
        Some(IdentityField::new("id", |a: &mut AuditEntry, id| a.id = id))
    }
}

impl Labelled for AuditEntry {
    fn label(&self) -> String {
        format!("AuditEntry {}", self.message)
    }
}

impl StoredProcEntity<FakeConn> for AuditEntry {
    fn execute_insert(&mut self, conn: &FakeConn) -> Result<bool> {
        conn.record(format!("proc insert {}", self.message));
        Ok(self.handles)
    }

    fn execute_update(&mut self, conn: &FakeConn) -> Result<bool> {
        conn.record(format!("proc update {}", self.message));
        Ok(self.handles)
    }

    fn execute_delete(&mut self, conn: &FakeConn) -> Result<bool> {
        conn.record(format!("proc delete {}", self.message));
        Ok(self.handles)
    }
}

// ===== Executor =====

/// Generic executor that journals every call and hands out sequential ids
pub struct RecordingExecutor {
    next_id: Cell<IdentityValue>,
    generates: Cell<bool>,
    fail_on: RefCell<Option<String>>,
}

impl RecordingExecutor {
    pub fn starting_at(first_id: IdentityValue) -> Self {
        Self {
            next_id: Cell::new(first_id),
            generates: Cell::new(true),
            fail_on: RefCell::new(None),
        }
    }

    /// Make any operation on the entity with this label fail
    pub fn fail_on(&self, label: &str) {
        *self.fail_on.borrow_mut() = Some(label.to_string());
    }

    /// Whether inserts report a generated identity value
    pub fn generate_identities(&self, generates: bool) {
        self.generates.set(generates);
    }

    pub fn clear_failure(&self) {
        *self.fail_on.borrow_mut() = None;
    }

    fn run(&self, conn: &FakeConn, verb: &str, label: String) -> Result<()> {
        if self.fail_on.borrow().as_deref() == Some(label.as_str()) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op(verb)
                .with_message(format!("simulated failure on {}", label))
                .into());
        }
        conn.record(format!("{} {}", verb, label));
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    type Conn = FakeConn;
}

impl<E: Entity + Labelled> Crud<E> for RecordingExecutor {
    fn insert_returning_identity(
        &self,
        conn: &FakeConn,
        entity: &E,
    ) -> Result<Option<IdentityValue>> {
        self.run(conn, "insert", entity.label())?;
        if !self.generates.get() {
            return Ok(None);
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(Some(id))
    }

    fn update_by_key(&self, conn: &FakeConn, entity: &E) -> Result<()> {
        self.run(conn, "update", entity.label())
    }

    fn delete_by_key(&self, conn: &FakeConn, entity: &E) -> Result<()> {
        self.run(conn, "delete", entity.label())
    }
}

// ===== Transactions =====

pub struct FakeDatabase {
    pub journal: Journal,
    pub fail_commit: bool,
}

pub struct FakeTx {
    conn: FakeConn,
    fail_commit: bool,
}

impl TransactionHandle for FakeTx {
    type Conn = FakeConn;

    fn connection(&self) -> &FakeConn {
        &self.conn
    }

    fn commit(self) -> Result<()> {
        if self.fail_commit {
            self.conn.record("commit failed");
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("commit")
                .with_message("simulated commit failure")
                .into());
        }
        self.conn.record("commit");
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.conn.record("rollback");
        Ok(())
    }
}

impl TransactionSource for FakeDatabase {
    type Conn = FakeConn;
    type Tx<'a> = FakeTx;

    fn begin(&mut self) -> Result<FakeTx> {
        let conn = FakeConn {
            journal: self.journal.clone(),
        };
        conn.record("begin");
        Ok(FakeTx {
            conn,
            fail_commit: self.fail_commit,
        })
    }
}

pub type TestUnitOfWork = UnitOfWork<FakeDatabase, RecordingExecutor>;

/// Registry with every fixture entity registered
pub fn registry(first_id: IdentityValue) -> StrategyRegistry<RecordingExecutor> {
    let mut registry = StrategyRegistry::new(RecordingExecutor::starting_at(first_id));
    registry
        .register::<Customer>()
        .register::<Order>()
        .register::<Tag>()
        .register_stored_proc::<AuditEntry>();
    registry
}

/// A unit of work over a fresh journal
pub fn unit_of_work(first_id: IdentityValue) -> (TestUnitOfWork, Journal) {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let database = FakeDatabase {
        journal: journal.clone(),
        fail_commit: false,
    };
    (UnitOfWork::new(database, registry(first_id)), journal)
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}
