// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Inventory Store - an embedded transactional graph store
//!
//! The store keeps an inventory graph (vertices, edges and their properties)
//! in memory and makes it transactional and durable.
//!
//! # Features
//!
//! - **Locking Transactions**: many concurrent readers, a single writer
//! - **Rollback**: every mutation is recorded with its prior state and undone in reverse
//! - **Durability**: one checksummed commit segment per committed transaction
//! - **Recovery**: leftover segments are replayed over the base snapshot at startup
//! - **Compaction**: a background thread folds segments into the snapshot
//! - **Traversals**: step pipelines whose mutations are intercepted like any other
//!
//! # Usage
//!
//! ```ignore
//! use inventory_store::{StoreConfig, TransactionLockingGraph};
//!
//! let store = TransactionLockingGraph::open(StoreConfig::new("./inventory"))?;
//! let tx = store.open_transaction()?;
//! let host = tx.add_vertex("host")?;
//! host.set_property("name", "db-01")?;
//! tx.commit()?;
//! store.close()?;
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod frame;
pub mod storage;
pub mod traversal;
pub mod txn;

pub use config::StoreConfig;
pub use element::{LockingEdge, LockingProperty, LockingVertex, Wrap};
pub use error::{Result, StoreError};
pub use frame::TransactionFrame;
pub use storage::{Direction, Edge, ElementId, ElementRef, Properties, Value, Vertex};
pub use traversal::{
    DetachedElement, ElementWrappingStrategy, TransactionLockingStrategy, Traversal,
    TraversalStrategy, Traverser,
};
pub use txn::{
    FlushReport, LockingTransaction, MutationEvent, RecoveryReport, TransactionLockingGraph,
    TransactionState,
};

/// Inventory Store version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Inventory Store crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
