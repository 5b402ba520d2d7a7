//! Transaction frame tests
//!
//! A frame retries its whole unit of work while another writer holds the
//! graph, and gives up after its retry budget.

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use inventory_store::{StoreError, TransactionFrame};
use testutils::test_fixture::TestStore;

#[test]
fn test_frame_retries_until_writer_finishes() {
    let fixture = TestStore::with_lock_timeout(Duration::from_millis(100));
    let store = fixture.store();
    let (locked_tx, locked_rx) = mpsc::channel();

    thread::scope(|s| {
        s.spawn(move || {
            let tx = store.open_transaction().unwrap();
            tx.add_vertex("maintenance").unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(300));
            tx.commit().unwrap();
        });

        locked_rx.recv().unwrap();
        let mut frame = TransactionFrame::new(store)
            .with_max_retries(10)
            .with_retry_delay(Duration::from_millis(100));
        frame.record(|tx| {
            let host = tx.add_vertex("host")?;
            host.set_property("name", "web-01")?;
            Ok(())
        });
        frame.commit().unwrap();
        assert_eq!(frame.pending(), 0);
    });

    let tx = store.open_transaction().unwrap();
    assert_eq!(tx.vertices().unwrap().len(), 2);
    tx.rollback().unwrap();
    assert_eq!(store.segment_count().unwrap(), 2);
}

#[test]
fn test_frame_gives_up_after_retry_budget() {
    let fixture = TestStore::with_lock_timeout(Duration::from_millis(50));
    let store = fixture.store();
    let (locked_tx, locked_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        s.spawn(move || {
            let tx = store.open_transaction().unwrap();
            tx.add_vertex("maintenance").unwrap();
            locked_tx.send(()).unwrap();
            done_rx.recv().unwrap();
            tx.rollback().unwrap();
        });

        locked_rx.recv().unwrap();
        let frame = TransactionFrame::new(store)
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(10));
        let mut calls = 0;
        let result = frame.run(|tx| {
            calls += 1;
            tx.add_vertex("host").map(|_| ())
        });
        done_tx.send(()).unwrap();

        assert!(matches!(result, Err(StoreError::GraphLocked { .. })));
        assert_eq!(calls, 0);
    });
}

#[test]
fn test_run_returns_value_of_work() {
    let fixture = TestStore::new();
    let store = fixture.store();
    let frame = TransactionFrame::new(store);

    let id = frame
        .run(|tx| Ok(tx.add_vertex("host")?.id()))
        .unwrap();
    let label = frame
        .run(|tx| tx.vertex(id)?.map(|v| v.label()).transpose())
        .unwrap();
    assert_eq!(label.as_deref(), Some("host"));
}
