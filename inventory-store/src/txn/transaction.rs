// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Locking transaction
//!
//! A transaction starts holding the store's shared lock and trades it for the
//! exclusive lock on its first write. The upgrade is release-then-acquire:
//! between dropping the shared guard and obtaining the exclusive one another
//! writer may run and commit, so anything read before the first write may be
//! stale afterwards. Elements are re-resolved by id on every access.
//!
//! Lock guards are `!Send`, which keeps a transaction on the thread that
//! opened it. A thread may hold at most one open transaction per store,
//! because the shared lock is not reentrant once a writer is queued.

use std::cell::RefCell;
use std::fmt;

use log::{debug, error, warn};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;

use super::log::{MutationEvent, MutationLog};
use super::manager::TransactionLockingGraph;
use super::state::{self, TransactionState};
use crate::element::{LockingEdge, LockingVertex};
use crate::error::{Result, StoreError};
use crate::storage::{ElementId, GraphCache, GraphStats, Properties};
use crate::traversal::Traversal;

/// Lock currently held by a transaction
enum LockHold {
    Released,
    Shared(ArcRwLockReadGuard<RawRwLock, GraphCache>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, GraphCache>),
}

struct TxInner {
    state: TransactionState,
    hold: LockHold,
    log: MutationLog,
}

impl TxInner {
    /// Undo the logged mutations against the exclusively held graph
    fn revert(&mut self) -> Result<usize> {
        let TxInner { hold, log, .. } = self;
        match hold {
            LockHold::Exclusive(graph) => log.revert_all(&mut **graph),
            _ if log.is_empty() => Ok(0),
            _ => {
                log.clear();
                Err(StoreError::NoActiveTransaction)
            }
        }
    }
}

/// A transaction against a [`TransactionLockingGraph`]
pub struct LockingTransaction<'g> {
    store: &'g TransactionLockingGraph,
    inner: RefCell<TxInner>,
}

impl<'g> LockingTransaction<'g> {
    /// Create a closed transaction bound to `store`
    pub(crate) fn new(store: &'g TransactionLockingGraph) -> Self {
        Self {
            store,
            inner: RefCell::new(TxInner {
                state: TransactionState::Closed,
                hold: LockHold::Released,
                log: MutationLog::new(),
            }),
        }
    }

    /// Open the transaction, waiting at most the configured lock timeout for the shared lock
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_open() {
            return Err(StoreError::NestedTransaction);
        }

        let store_id = self.store.store_id();
        if !state::register_open(store_id) {
            return Err(StoreError::NestedTransaction);
        }

        let timeout = self.store.config().lock_timeout;
        let guard = match self.store.graph_lock().try_read_arc_for(timeout) {
            Some(guard) => guard,
            None => {
                state::unregister_open(store_id);
                debug!("Timed out after {:?} waiting for the shared lock", timeout);
                return Err(StoreError::GraphLocked { timeout });
            }
        };
        if !guard.is_open() {
            drop(guard);
            state::unregister_open(store_id);
            return Err(StoreError::Closed);
        }

        inner.hold = LockHold::Shared(guard);
        inner.state = TransactionState::OpenRead;
        debug!("Transaction opened on {}", store_id);
        Ok(())
    }

    /// Make sure the exclusive lock is held, upgrading from the shared lock if needed
    pub fn lock_for_writing(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            TransactionState::Closed => Err(StoreError::NoActiveTransaction),
            TransactionState::OpenWrite => Ok(()),
            TransactionState::OpenRead => {
                // Release-then-acquire; see module docs.
                inner.hold = LockHold::Released;
                let guard = self.store.graph_lock().write_arc();
                if !guard.is_open() {
                    drop(guard);
                    inner.state = TransactionState::Closed;
                    inner.log.clear();
                    state::unregister_open(self.store.store_id());
                    return Err(StoreError::Closed);
                }
                inner.hold = LockHold::Exclusive(guard);
                inner.state = TransactionState::OpenWrite;
                debug!("Transaction upgraded to the exclusive lock");
                Ok(())
            }
        }
    }

    /// Append a mutation to this transaction's log
    pub fn register_mutation(&self, event: MutationEvent) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.state.is_open() {
            return Err(StoreError::NoActiveTransaction);
        }
        debug!("Intercepted mutation: {}", event.describe());
        inner.log.record(event);
        Ok(())
    }

    /// Persist the mutation log as a commit segment and release the lock.
    ///
    /// If the segment cannot be written the transaction is rolled back and
    /// the write error returned.
    pub fn commit(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.state.is_open() {
            return Err(StoreError::NoActiveTransaction);
        }

        let result = if inner.log.is_empty() {
            Ok(())
        } else {
            let appended = self.store.commit_log().append(inner.log.events());
            match appended {
                Ok(sequence) => {
                    debug!(
                        "Committed {} mutations as segment {}",
                        inner.log.len(),
                        sequence
                    );
                    inner.log.clear();
                    Ok(())
                }
                Err(e) => {
                    warn!("Commit failed, rolling back: {}", e);
                    if let Err(revert_error) = inner.revert() {
                        error!("Rollback after failed commit also failed: {}", revert_error);
                    }
                    Err(e.into())
                }
            }
        };

        self.end(&mut inner);
        result
    }

    /// Undo every mutation of this transaction and release the lock
    pub fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.state.is_open() {
            return Err(StoreError::NoActiveTransaction);
        }

        let result = inner.revert().map(|reverted| {
            debug!("Rolled back {} mutations", reverted);
        });
        self.end(&mut inner);
        result
    }

    fn end(&self, inner: &mut TxInner) {
        inner.hold = LockHold::Released;
        inner.state = TransactionState::Closed;
        inner.log.clear();
        state::unregister_open(self.store.store_id());
    }

    pub fn state(&self) -> TransactionState {
        self.inner.borrow().state
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Number of mutations recorded since the transaction opened
    pub fn mutation_count(&self) -> usize {
        self.inner.borrow().log.len()
    }

    /// The store this transaction runs against
    pub fn store(&self) -> &'g TransactionLockingGraph {
        self.store
    }

    /// Run `f` against the graph under whichever lock is held
    pub(crate) fn read<R>(&self, f: impl FnOnce(&GraphCache) -> R) -> Result<R> {
        let inner = self.inner.borrow();
        let graph: &GraphCache = match &inner.hold {
            LockHold::Released => return Err(StoreError::NoActiveTransaction),
            LockHold::Shared(guard) => &**guard,
            LockHold::Exclusive(guard) => &**guard,
        };
        if !graph.is_open() {
            return Err(StoreError::Closed);
        }
        Ok(f(graph))
    }

    /// Run `f` against the graph under the exclusive lock, upgrading first
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut GraphCache) -> Result<R>) -> Result<R> {
        self.lock_for_writing()?;
        let mut inner = self.inner.borrow_mut();
        match &mut inner.hold {
            LockHold::Exclusive(guard) => f(&mut **guard),
            _ => Err(StoreError::NoActiveTransaction),
        }
    }

    /// Create a vertex without properties
    pub fn add_vertex(&self, label: &str) -> Result<LockingVertex<'_>> {
        self.add_vertex_with(label, Properties::new())
    }

    /// Create a vertex with initial properties
    pub fn add_vertex_with(&self, label: &str, properties: Properties) -> Result<LockingVertex<'_>> {
        let record = self.write(|graph| {
            let id = graph.add_vertex(label, properties)?;
            graph
                .vertex(id)
                .cloned()
                .ok_or_else(|| StoreError::ElementNotFound(format!("vertex {}", id)))
        })?;
        let id = record.id;
        self.register_mutation(MutationEvent::vertex_created(record))?;
        Ok(LockingVertex::new(self, id))
    }

    /// Look up a vertex by id
    pub fn vertex(&self, id: ElementId) -> Result<Option<LockingVertex<'_>>> {
        let exists = self.read(|graph| graph.vertex(id).is_some())?;
        Ok(exists.then(|| LockingVertex::new(self, id)))
    }

    /// Look up an edge by id
    pub fn edge(&self, id: ElementId) -> Result<Option<LockingEdge<'_>>> {
        let exists = self.read(|graph| graph.edge(id).is_some())?;
        Ok(exists.then(|| LockingEdge::new(self, id)))
    }

    /// All vertices in ascending id order
    pub fn vertices(&self) -> Result<Vec<LockingVertex<'_>>> {
        let ids: Vec<ElementId> = self.read(|graph| graph.vertices().map(|v| v.id).collect())?;
        Ok(ids.into_iter().map(|id| LockingVertex::new(self, id)).collect())
    }

    /// All edges in ascending id order
    pub fn edges(&self) -> Result<Vec<LockingEdge<'_>>> {
        let ids: Vec<ElementId> = self.read(|graph| graph.edges().map(|e| e.id).collect())?;
        Ok(ids.into_iter().map(|id| LockingEdge::new(self, id)).collect())
    }

    /// Counts of the graph as seen by this transaction
    pub fn stats(&self) -> Result<GraphStats> {
        self.read(|graph| graph.stats())
    }

    /// Start a traversal with the default decoration strategies
    pub fn traversal(&self) -> Traversal<'_> {
        Traversal::new(self)
    }
}

impl fmt::Debug for LockingTransaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("LockingTransaction")
            .field("store", &self.store.store_id())
            .field("state", &inner.state)
            .field("mutations", &inner.log.len())
            .finish()
    }
}

impl Drop for LockingTransaction<'_> {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Transaction dropped while open; rolling back");
            if let Err(e) = self.rollback() {
                error!("Rollback of dropped transaction failed: {}", e);
            }
        }
    }
}
