//! Locking tests
//!
//! Readers share the graph, a writer excludes everyone else, and a thread
//! never holds two transactions on the same store.

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::mpsc;
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use inventory_store::txn::wal::{list_segments, read_segment};
use inventory_store::{MutationEvent, Properties, StoreError, TransactionFrame, Value};
use testutils::test_fixture::{TestStore, TEST_LOCK_TIMEOUT};

#[test]
fn test_nested_open_rejected() {
    let fixture = TestStore::new();
    let store = fixture.store();

    let tx = store.open_transaction().unwrap();
    assert!(matches!(
        store.open_transaction(),
        Err(StoreError::NestedTransaction)
    ));
    assert!(matches!(tx.open(), Err(StoreError::NestedTransaction)));
    assert!(matches!(store.flush(), Err(StoreError::NestedTransaction)));

    tx.commit().unwrap();
    let again = store.open_transaction().unwrap();
    again.rollback().unwrap();
    store.flush().unwrap();
}

#[test]
fn test_transactions_on_different_stores_may_overlap() {
    let first = TestStore::new();
    let second = TestStore::new();

    let a = first.store().open_transaction().unwrap();
    let b = second.store().open_transaction().unwrap();
    a.add_vertex("host").unwrap();
    b.add_vertex("host").unwrap();
    a.commit().unwrap();
    b.commit().unwrap();
}

#[test]
fn test_readers_share_the_graph() {
    let fixture = TestStore::new();
    let store = fixture.store();
    let readers = 4;
    let barrier = Barrier::new(readers);

    thread::scope(|s| {
        for _ in 0..readers {
            s.spawn(|| {
                let tx = store.open_transaction().unwrap();
                // Every reader holds its shared lock at this point
                barrier.wait();
                assert!(tx.vertices().unwrap().is_empty());
                tx.rollback().unwrap();
            });
        }
    });
}

#[test]
fn test_open_times_out_while_writer_holds_lock() {
    let fixture = TestStore::new();
    let store = fixture.store();
    let (locked_tx, locked_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        s.spawn(move || {
            let tx = store.open_transaction().unwrap();
            tx.add_vertex("host").unwrap();
            locked_tx.send(()).unwrap();
            done_rx.recv().unwrap();
            tx.rollback().unwrap();
        });

        locked_rx.recv().unwrap();
        let started = Instant::now();
        let err = store.open_transaction().unwrap_err();
        let waited = started.elapsed();
        done_tx.send(()).unwrap();

        match &err {
            StoreError::GraphLocked { timeout } => assert_eq!(*timeout, TEST_LOCK_TIMEOUT),
            other => panic!("expected GraphLocked, got {:?}", other),
        }
        assert!(waited >= TEST_LOCK_TIMEOUT / 2);
        assert!(store.is_transaction_retry_warranted(&err));
    });
}

#[test]
fn test_second_writer_waits_for_first() {
    let fixture = TestStore::with_lock_timeout(Duration::from_secs(10));
    let store = fixture.store();
    let order = Mutex::new(Vec::new());
    let order = &order;
    let (writing_tx, writing_rx) = mpsc::channel();

    thread::scope(|s| {
        s.spawn(move || {
            let tx = store.open_transaction().unwrap();
            tx.add_vertex("first").unwrap();
            writing_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
            order.lock().unwrap().push("first committed");
            tx.commit().unwrap();
        });
        s.spawn(move || {
            writing_rx.recv().unwrap();
            let tx = store.open_transaction().unwrap();
            order.lock().unwrap().push("second opened");
            assert_eq!(tx.vertices().unwrap().len(), 1);
            tx.add_vertex("second").unwrap();
            tx.commit().unwrap();
        });
    });

    assert_eq!(
        *order.lock().unwrap(),
        vec!["first committed", "second opened"]
    );
    assert_eq!(store.segment_count().unwrap(), 2);
}

#[test]
fn test_concurrent_writers_never_interleave_logs() {
    let fixture = TestStore::with_lock_timeout(Duration::from_secs(10));
    let store = fixture.store();
    let writers: i32 = 4;
    let per_writer = 5;

    thread::scope(|s| {
        for writer in 0..writers {
            s.spawn(move || {
                let frame = TransactionFrame::new(store);
                frame
                    .run(|tx| {
                        for _ in 0..per_writer {
                            let mut properties = Properties::new();
                            properties.insert("writer".to_string(), Value::from(writer));
                            tx.add_vertex_with("host", properties)?;
                        }
                        Ok(())
                    })
                    .unwrap();
            });
        }
    });

    let segments = list_segments(fixture.directory()).unwrap();
    assert_eq!(segments.len(), writers as usize);
    for info in segments {
        let segment = read_segment(&info.path).unwrap();
        assert_eq!(segment.events.len(), per_writer);
        let owners: Vec<Value> = segment
            .events
            .iter()
            .filter_map(|event| match event {
                MutationEvent::Vertex {
                    new: Some(vertex), ..
                } => vertex.get_property("writer").cloned(),
                _ => None,
            })
            .collect();
        assert_eq!(owners.len(), per_writer);
        assert!(owners.iter().all(|owner| *owner == owners[0]));
    }

    let tx = store.open_transaction().unwrap();
    assert_eq!(tx.vertices().unwrap().len(), writers as usize * per_writer);
    tx.rollback().unwrap();
}

#[test]
fn test_traversal_skips_vertices_removed_during_upgrade() {
    let fixture = TestStore::with_lock_timeout(Duration::from_secs(10));
    let store = fixture.store();

    let tx = store.open_transaction().unwrap();
    let mut servers = Vec::new();
    for _ in 0..3 {
        servers.push(tx.add_vertex("server").unwrap().id());
    }
    tx.commit().unwrap();
    drop(tx);

    let (opened_tx, opened_rx) = mpsc::channel();
    let (upgrading_tx, upgrading_rx) = mpsc::channel();
    let removed = servers[0];

    thread::scope(|s| {
        s.spawn(move || {
            let tx = store.open_transaction().unwrap();
            opened_tx.send(()).unwrap();
            upgrading_rx.recv().unwrap();
            // Give the other writer time to queue for the exclusive lock
            thread::sleep(Duration::from_millis(200));

            let patched = tx
                .traversal()
                .v()
                .has_label(&["server"])
                .property("patched", true)
                .count()
                .unwrap();
            assert_eq!(patched, 2);
            assert_eq!(tx.mutation_count(), 2);
            tx.commit().unwrap();
        });
        s.spawn(move || {
            opened_rx.recv().unwrap();
            let tx = store.open_transaction().unwrap();
            upgrading_tx.send(()).unwrap();
            // Waits until the traversal gives up its shared lock
            tx.lock_for_writing().unwrap();
            tx.vertex(removed).unwrap().unwrap().remove().unwrap();
            tx.commit().unwrap();
        });
    });

    assert_eq!(fixture.vertex_value(removed, "patched"), None);
    for id in &servers[1..] {
        assert_eq!(fixture.vertex_value(*id, "patched"), Some(Value::from(true)));
    }
    assert_eq!(fixture.contents().vertices.len(), 2);
}
