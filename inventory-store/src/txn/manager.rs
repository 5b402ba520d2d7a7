// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction-locking graph
//!
//! The single entry point of the store. It owns the reader/writer lock over
//! the live graph, recovers the graph from disk when opened, runs the
//! background compaction thread and hands out transactions.
//!
//! Flushing takes the exclusive lock directly, outside any transaction:
//! the live graph is closed (writing the base snapshot with its
//! `folded_through` mark), the folded segments are deleted and a fresh graph
//! is opened from the snapshot just written.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use parking_lot::RwLock;

use super::compaction::CompactionTask;
use super::recovery::{self, RecoveryReport};
use super::state::{self, StoreId};
use super::transaction::LockingTransaction;
use super::wal::CommitLog;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::storage::{GraphCache, StorageError, SNAPSHOT_FILE};

/// Outcome of one flush-to-disk cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Segments deleted because the snapshot now contains them
    pub segments_folded: usize,
    /// Highest segment sequence contained in the snapshot
    pub folded_through: u64,
    pub vertex_count: usize,
    pub edge_count: usize,
}

/// State shared between the store handle and its compaction thread
#[derive(Debug)]
struct StoreShared {
    id: StoreId,
    directory: PathBuf,
    config: StoreConfig,
    graph: Arc<RwLock<GraphCache>>,
    commit_log: CommitLog,
}

impl StoreShared {
    fn flush(&self, reopen: bool) -> Result<FlushReport> {
        let mut graph = self.graph.write();
        if !graph.is_open() {
            return Err(StoreError::Closed);
        }

        let folded_through = self.commit_log.last_allocated();
        if reopen
            && folded_through == graph.folded_through()
            && self.directory.join(SNAPSHOT_FILE).exists()
        {
            debug!("Nothing to flush for {}", self.id);
            return Ok(FlushReport {
                segments_folded: 0,
                folded_through,
                vertex_count: graph.vertex_count(),
                edge_count: graph.edge_count(),
            });
        }

        graph.set_folded_through(folded_through);
        let vertex_count = graph.vertex_count();
        let edge_count = graph.edge_count();
        graph.close()?;
        let segments_folded = self.commit_log.delete_through(folded_through)?;

        if reopen {
            match GraphCache::open(&self.directory) {
                Ok(fresh) => *graph = fresh,
                Err(e) => {
                    error!(
                        "Failed to reopen {} after flush; store is unusable: {}",
                        self.directory.display(),
                        e
                    );
                    return Err(e.into());
                }
            }
        }

        info!(
            "Flushed {}: folded {} segments through {} ({} vertices, {} edges)",
            self.id, segments_folded, folded_through, vertex_count, edge_count
        );
        Ok(FlushReport {
            segments_folded,
            folded_through,
            vertex_count,
            edge_count,
        })
    }
}

/// Transactional graph store over an embedded in-memory graph
#[derive(Debug)]
pub struct TransactionLockingGraph {
    shared: Arc<StoreShared>,
    compaction: Option<CompactionTask>,
    recovery: RecoveryReport,
    closed: bool,
}

impl TransactionLockingGraph {
    /// Open (and recover) the store described by `config`
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let directory = config.require_directory()?.to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| StorageError::io(&directory, e))?;

        let (graph, recovery) = recovery::recover(&directory)?;
        let commit_log = CommitLog::open(&directory, graph.folded_through())?;
        let id = StoreId::next();
        info!(
            "Opened {} at {} ({} vertices, {} edges)",
            id,
            directory.display(),
            graph.vertex_count(),
            graph.edge_count()
        );

        let shared = Arc::new(StoreShared {
            id,
            directory,
            config,
            graph: Arc::new(RwLock::new(graph)),
            commit_log,
        });

        let worker = Arc::clone(&shared);
        let compaction = CompactionTask::spawn(
            format!("inventory-compaction-{}", id.id()),
            shared.config.compaction_interval,
            move || worker.flush(true).map(|_| ()),
        )?;

        Ok(Self {
            shared,
            compaction: Some(compaction),
            recovery,
            closed: false,
        })
    }

    /// A closed transaction bound to this store
    pub fn new_transaction(&self) -> LockingTransaction<'_> {
        LockingTransaction::new(self)
    }

    /// Open a new transaction, waiting at most `lock_timeout` for the shared lock
    pub fn open_transaction(&self) -> Result<LockingTransaction<'_>> {
        let tx = LockingTransaction::new(self);
        tx.open()?;
        Ok(tx)
    }

    /// Fold all committed segments into the base snapshot now
    pub fn flush(&self) -> Result<FlushReport> {
        if state::is_open_on_thread(self.shared.id) {
            // The exclusive lock would wait on this thread's own transaction
            return Err(StoreError::NestedTransaction);
        }
        self.shared.flush(true)
    }

    /// Ask the background task to flush without waiting for it
    pub fn request_compaction(&self) {
        if let Some(task) = &self.compaction {
            task.trigger();
        }
    }

    /// Stop the background task and write a final snapshot
    pub fn close(mut self) -> Result<FlushReport> {
        self.shutdown(true).map(|report| report.unwrap_or_default())
    }

    /// Stop the background task and drop the live graph without writing a
    /// snapshot. Committed segments stay on disk and are replayed by the next open.
    pub fn close_without_flush(mut self) {
        let _ = self.shutdown(false);
    }

    fn shutdown(&mut self, flush: bool) -> Result<Option<FlushReport>> {
        if self.closed {
            return Ok(None);
        }
        self.closed = true;

        if let Some(mut task) = self.compaction.take() {
            task.shutdown(self.shared.config.shutdown_timeout);
        }

        if flush {
            let report = self.shared.flush(false)?;
            info!("Closed {}", self.shared.id);
            Ok(Some(report))
        } else {
            self.shared.graph.write().close_discarding();
            info!("Closed {} without flushing", self.shared.id);
            Ok(None)
        }
    }

    pub fn directory(&self) -> &Path {
        &self.shared.directory
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// What the startup recovery found and did
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Number of commit segments not yet folded into the snapshot
    pub fn segment_count(&self) -> Result<usize> {
        Ok(self.shared.commit_log.segment_count()?)
    }

    /// Whether `error` is worth retrying the whole transaction for
    pub fn is_transaction_retry_warranted(&self, error: &StoreError) -> bool {
        error.is_retryable()
    }

    pub(crate) fn store_id(&self) -> StoreId {
        self.shared.id
    }

    pub(crate) fn graph_lock(&self) -> &Arc<RwLock<GraphCache>> {
        &self.shared.graph
    }

    pub(crate) fn commit_log(&self) -> &CommitLog {
        &self.shared.commit_log
    }
}

impl Drop for TransactionLockingGraph {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown(true) {
            error!("Failed to close {}: {}", self.shared.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(dir: &Path) -> StoreConfig {
        StoreConfig::new(dir).with_lock_timeout(Duration::from_millis(100))
    }

    #[test]
    fn test_open_requires_directory() {
        let result = TransactionLockingGraph::open(StoreConfig::default());
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store");
        let store = TransactionLockingGraph::open(config(&path)).unwrap();
        assert!(path.is_dir());
        assert_eq!(store.directory(), path.as_path());
        store.close().unwrap();
        assert!(path.join(SNAPSHOT_FILE).exists());
    }

    #[test]
    fn test_flush_folds_segments() {
        let dir = tempfile::tempdir().unwrap();
        let store = TransactionLockingGraph::open(config(dir.path())).unwrap();

        for _ in 0..3 {
            let tx = store.open_transaction().unwrap();
            tx.add_vertex("resource").unwrap();
            tx.commit().unwrap();
        }
        assert_eq!(store.segment_count().unwrap(), 3);

        let report = store.flush().unwrap();
        assert_eq!(report.segments_folded, 3);
        assert_eq!(report.folded_through, 3);
        assert_eq!(report.vertex_count, 3);
        assert_eq!(store.segment_count().unwrap(), 0);

        let tx = store.open_transaction().unwrap();
        assert_eq!(tx.vertices().unwrap().len(), 3);
        tx.commit().unwrap();
    }

    #[test]
    fn test_flush_rejected_while_this_thread_has_a_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = TransactionLockingGraph::open(config(dir.path())).unwrap();
        let tx = store.open_transaction().unwrap();

        assert!(matches!(store.flush(), Err(StoreError::NestedTransaction)));
        tx.rollback().unwrap();
        assert!(store.flush().is_ok());
    }

    #[test]
    fn test_empty_commit_writes_no_segment() {
        let dir = tempfile::tempdir().unwrap();
        let store = TransactionLockingGraph::open(config(dir.path())).unwrap();
        let tx = store.open_transaction().unwrap();
        tx.commit().unwrap();
        assert_eq!(store.segment_count().unwrap(), 0);
    }
}
