//! Durability tests
//!
//! Stop the store without a final flush, reopen it and compare the recovered
//! graph with what was committed.

#[path = "testutils/mod.rs"]
mod testutils;

use std::fs;

use inventory_store::storage::{StorageError, SNAPSHOT_FILE};
use inventory_store::txn::wal::list_segments;
use inventory_store::{StoreError, TransactionLockingGraph, Value};
use testutils::test_fixture::TestStore;

/// Commit a small inventory over three transactions, returning the rack id
fn populate(fixture: &TestStore) -> inventory_store::ElementId {
    let store = fixture.store();

    let tx = store.open_transaction().unwrap();
    let rack = tx.add_vertex("rack").unwrap();
    rack.set_property("row", "A").unwrap();
    let rack_id = rack.id();
    tx.commit().unwrap();

    let tx = store.open_transaction().unwrap();
    let rack = tx.vertex(rack_id).unwrap().unwrap();
    for name in ["web-01", "web-02", "db-01"] {
        let server = tx.add_vertex("server").unwrap();
        server.set_property("name", name).unwrap();
        rack.add_edge("contains", &server).unwrap();
    }
    tx.commit().unwrap();

    let tx = store.open_transaction().unwrap();
    let rack = tx.vertex(rack_id).unwrap().unwrap();
    rack.set_property("row", "B").unwrap();
    let doomed = rack.vertices(inventory_store::Direction::Out, &[]).unwrap()[0];
    doomed.remove().unwrap();
    tx.commit().unwrap();

    rack_id
}

#[test]
fn test_recovery_equals_direct_application() {
    let mut fixture = TestStore::new();
    let rack_id = populate(&fixture);
    assert_eq!(fixture.store().segment_count().unwrap(), 3);
    let expected = fixture.contents();

    fixture.crash_and_recover();

    let report = fixture.store().recovery_report().clone();
    assert_eq!(report.segments_replayed, 3);
    assert_eq!(report.folded_through, 3);
    assert!(report.events_replayed > 0);
    assert_eq!(fixture.store().segment_count().unwrap(), 0);
    assert_eq!(fixture.contents(), expected);
    assert_eq!(fixture.vertex_value(rack_id, "row"), Some(Value::from("B")));
}

#[test]
fn test_compaction_preserves_content() {
    let mut fixture = TestStore::new();
    populate(&fixture);
    let expected = fixture.contents();

    let report = fixture.store().flush().unwrap();
    assert_eq!(report.segments_folded, 3);
    assert_eq!(report.folded_through, 3);
    assert_eq!(report.vertex_count, 3);
    assert_eq!(report.edge_count, 2);
    assert_eq!(fixture.store().segment_count().unwrap(), 0);
    assert!(fixture.directory().join(SNAPSHOT_FILE).exists());
    assert_eq!(fixture.contents(), expected);

    fixture.shutdown();
    fixture.reopen();
    assert_eq!(fixture.store().recovery_report().segments_replayed, 0);
    assert_eq!(fixture.contents(), expected);
}

#[test]
fn test_commits_after_flush_recover_on_top_of_snapshot() {
    let mut fixture = TestStore::new();
    let rack_id = populate(&fixture);
    fixture.store().flush().unwrap();

    let tx = fixture.store().open_transaction().unwrap();
    tx.vertex(rack_id)
        .unwrap()
        .unwrap()
        .set_property("row", "C")
        .unwrap();
    tx.commit().unwrap();
    drop(tx);
    let expected = fixture.contents();

    fixture.crash_and_recover();
    let report = fixture.store().recovery_report().clone();
    assert_eq!(report.segments_replayed, 1);
    assert_eq!(report.folded_through, 4);
    assert_eq!(fixture.contents(), expected);
}

#[test]
fn test_folded_segments_are_not_replayed_twice() {
    let mut fixture = TestStore::new();
    let rack_id = populate(&fixture);
    let segments: Vec<(String, Vec<u8>)> = list_segments(fixture.directory())
        .unwrap()
        .into_iter()
        .map(|info| {
            let name = info.path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&info.path).unwrap())
        })
        .collect();
    assert_eq!(segments.len(), 3);

    fixture.store().flush().unwrap();
    let expected = fixture.contents();
    fixture.crash();

    // A crash between writing the snapshot and deleting segments leaves them behind
    for (name, bytes) in &segments {
        fs::write(fixture.directory().join(name), bytes).unwrap();
    }
    fixture.reopen();

    let report = fixture.store().recovery_report().clone();
    assert_eq!(report.segments_replayed, 0);
    assert_eq!(report.stale_segments_removed, 3);
    assert_eq!(fixture.contents(), expected);
    assert_eq!(fixture.vertex_value(rack_id, "row"), Some(Value::from("B")));
}

#[test]
fn test_stray_temp_files_removed_at_startup() {
    let mut fixture = TestStore::new();
    populate(&fixture);
    fixture.crash();

    let stray_segment = fixture.directory().join("commit-4.tmp");
    let stray_snapshot = fixture.directory().join(format!("{}.tmp", SNAPSHOT_FILE));
    fs::write(&stray_segment, b"half written").unwrap();
    fs::write(&stray_snapshot, b"half written").unwrap();

    fixture.reopen();
    assert_eq!(fixture.store().recovery_report().stray_files_removed, 2);
    assert_eq!(fixture.store().recovery_report().segments_replayed, 3);
    assert!(!stray_segment.exists());
    assert!(!stray_snapshot.exists());
}

#[test]
fn test_corrupt_segment_is_reported() {
    let mut fixture = TestStore::new();
    populate(&fixture);
    fixture.crash();

    let path = fixture.directory().join("commit-2");
    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = TransactionLockingGraph::open(fixture.config()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Storage(StorageError::Corrupted { .. })
    ));
    assert!(path.exists());
}

#[test]
fn test_empty_directory_opens_empty_graph() {
    let fixture = TestStore::new();
    let report = fixture.store().recovery_report();
    assert_eq!(report.segments_folded(), 0);
    assert_eq!(report.stray_files_removed, 0);
    assert!(fixture.contents().vertices.is_empty());
}
