//! Property tests for the pending-change store
//!
//! Arbitrary staging sequences over two entity types must always flush in
//! Insert → Update → Delete order, keep per-type staging order, and leave
//! the store untouched by a flush.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use proptest::prelude::*;
use stagehand_core::{shared, OperationKind, PendingChangeStore, StrategyRegistry};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Order,
    Tag,
}

fn arb_operation() -> impl Strategy<Value = OperationKind> {
    prop_oneof![
        Just(OperationKind::Insert),
        Just(OperationKind::Update),
        Just(OperationKind::Delete),
    ]
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Order), Just(Kind::Tag)]
}

fn arb_staging() -> impl Strategy<Value = Vec<(OperationKind, Kind)>> {
    prop::collection::vec((arb_operation(), arb_kind()), 0..40)
}

/// Stage one fresh entity per step; returns the journal line each should produce
fn stage_all(store: &mut PendingChangeStore, steps: &[(OperationKind, Kind)]) -> Vec<String> {
    let mut labels = Vec::new();

    for (index, (operation, kind)) in steps.iter().enumerate() {
        let name = format!("e{}", index);
        match kind {
            Kind::Order => {
                let order = shared(Order::new(&name));
                store.stage(&order, *operation);
                labels.push(format!("{} Order {}", operation, name));
            }
            Kind::Tag => {
                let tag = shared(Tag { name: name.clone() });
                store.stage(&tag, *operation);
                labels.push(format!("{} Tag {}", operation, name));
            }
        }
    }

    labels
}

fn flush_rank(line: &str) -> usize {
    if line.starts_with("insert") {
        0
    } else if line.starts_with("update") {
        1
    } else {
        2
    }
}

proptest! {
    #[test]
    fn prop_flush_runs_in_operation_order(steps in arb_staging()) {
        let mut store = PendingChangeStore::new();
        stage_all(&mut store, &steps);

        let mut registry = StrategyRegistry::new(RecordingExecutor::starting_at(1));
        registry.register::<Order>().register::<Tag>();
        let conn = FakeConn { journal: Rc::new(RefCell::new(Vec::new())) };

        let report = store.flush(&registry, &conn).unwrap();
        let calls = entries(&conn.journal);

        prop_assert_eq!(calls.len(), steps.len());
        prop_assert_eq!(report.total(), steps.len());
        let ranks: Vec<usize> = calls.iter().map(|c| flush_rank(c)).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_flush_keeps_staging_order_within_type(steps in arb_staging()) {
        let mut store = PendingChangeStore::new();
        let labels = stage_all(&mut store, &steps);

        let mut registry = StrategyRegistry::new(RecordingExecutor::starting_at(1));
        registry.register::<Order>().register::<Tag>();
        let conn = FakeConn { journal: Rc::new(RefCell::new(Vec::new())) };
        store.flush(&registry, &conn).unwrap();
        let calls = entries(&conn.journal);

        for prefix in ["insert Order", "insert Tag", "update Order", "update Tag", "delete Order", "delete Tag"] {
            let staged: Vec<&String> = labels.iter().filter(|l| l.starts_with(prefix)).collect();
            let flushed: Vec<&String> = calls.iter().filter(|c| c.starts_with(prefix)).collect();
            prop_assert_eq!(staged, flushed);
        }
    }

    #[test]
    fn prop_snapshot_partitions_and_flush_preserves_store(steps in arb_staging()) {
        let mut store = PendingChangeStore::new();
        stage_all(&mut store, &steps);

        for operation in OperationKind::FLUSH_ORDER {
            let expected = steps.iter().filter(|(op, _)| *op == operation).count();
            prop_assert_eq!(store.count(operation), expected);
            prop_assert_eq!(store.snapshot().get(operation).len(), expected);
        }

        let mut registry = StrategyRegistry::new(RecordingExecutor::starting_at(1));
        registry.register::<Order>().register::<Tag>();
        let conn = FakeConn { journal: Rc::new(RefCell::new(Vec::new())) };
        store.flush(&registry, &conn).unwrap();
        prop_assert_eq!(store.len(), steps.len());

        store.reset();
        prop_assert!(store.is_empty());
        prop_assert!(store.snapshot().is_empty());
    }
}
