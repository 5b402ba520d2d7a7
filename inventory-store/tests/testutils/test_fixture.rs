//! Test fixture for Inventory Store integration tests
//!
//! Each fixture owns a temporary directory, so tests never share state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use inventory_store::{
    ElementId, Properties, StoreConfig, TransactionLockingGraph, Value,
};

/// Lock timeout used by fixtures, short enough to keep contention tests fast
pub const TEST_LOCK_TIMEOUT: Duration = Duration::from_millis(200);

/// Install a test logger once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Store in a scratch directory
pub struct TestStore {
    store: Option<TransactionLockingGraph>,
    directory: PathBuf,
    lock_timeout: Duration,
    _temp_dir: tempfile::TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(TEST_LOCK_TIMEOUT)
    }

    /// Store whose transactions wait up to `lock_timeout` for the shared lock
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        init_logging();
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let directory = temp_dir.path().join("inventory");
        let store = TransactionLockingGraph::open(Self::config_for(&directory, lock_timeout))
            .expect("Failed to open store");
        TestStore {
            store: Some(store),
            directory,
            lock_timeout,
            _temp_dir: temp_dir,
        }
    }

    pub fn config_for(directory: &Path, lock_timeout: Duration) -> StoreConfig {
        StoreConfig::new(directory)
            .with_lock_timeout(lock_timeout)
            .with_shutdown_timeout(Duration::from_secs(5))
    }

    pub fn config(&self) -> StoreConfig {
        Self::config_for(&self.directory, self.lock_timeout)
    }

    pub fn store(&self) -> &TransactionLockingGraph {
        self.store.as_ref().expect("Store is closed")
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Stop the store without flushing, leaving commit segments on disk
    pub fn crash(&mut self) {
        if let Some(store) = self.store.take() {
            store.close_without_flush();
        }
    }

    /// Close the store with a final flush
    pub fn shutdown(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().expect("Failed to close store");
        }
    }

    /// Open the store again from its directory
    pub fn reopen(&mut self) {
        if self.store.is_none() {
            let store = TransactionLockingGraph::open(self.config()).expect("Failed to reopen store");
            self.store = Some(store);
        }
    }

    /// Crash, then reopen to run recovery
    pub fn crash_and_recover(&mut self) {
        self.crash();
        self.reopen();
    }

    /// Every vertex and edge as plain records, for comparing graphs
    pub fn contents(&self) -> GraphContents {
        let tx = self.store().open_transaction().expect("Failed to open transaction");
        let mut contents = GraphContents::default();
        for vertex in tx.vertices().expect("Failed to list vertices") {
            let record = vertex.detach().expect("Failed to detach vertex");
            contents.vertices.push((record.id, record.label, record.properties));
        }
        for edge in tx.edges().expect("Failed to list edges") {
            let record = edge.detach().expect("Failed to detach edge");
            contents.edges.push((
                record.id,
                record.label,
                record.out_vertex,
                record.in_vertex,
                record.properties,
            ));
        }
        tx.rollback().expect("Failed to end read transaction");
        contents
    }

    pub fn vertex_value(&self, id: ElementId, key: &str) -> Option<Value> {
        let tx = self.store().open_transaction().expect("Failed to open transaction");
        let value = tx
            .vertex(id)
            .expect("Failed to look up vertex")
            .and_then(|v| v.value(key).expect("Failed to read value"));
        tx.rollback().expect("Failed to end read transaction");
        value
    }
}

/// Snapshot of a whole graph
#[derive(Debug, Default, PartialEq)]
pub struct GraphContents {
    pub vertices: Vec<(ElementId, String, Properties)>,
    pub edges: Vec<(ElementId, String, ElementId, ElementId, Properties)>,
}
