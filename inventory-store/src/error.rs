// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store error types
//!
//! `GraphLocked` is the only retryable condition. Everything else is either a
//! programming error (using a transaction the wrong way) or a storage failure.

use std::time::Duration;

use thiserror::Error;

use crate::storage::{GraphError, StorageError};

/// Errors surfaced by the transaction-locking store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph is locked: could not acquire the shared lock within {timeout:?}")]
    GraphLocked { timeout: Duration },

    #[error("No transaction is open")]
    NoActiveTransaction,

    #[error("A transaction is already open on this thread for this store")]
    NestedTransaction,

    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Store is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// Whether retrying the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::GraphLocked { .. })
    }
}

impl From<GraphError> for StoreError {
    fn from(error: GraphError) -> Self {
        StoreError::Storage(StorageError::Graph(error))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ElementId;

    #[test]
    fn test_only_graph_locked_is_retryable() {
        let locked = StoreError::GraphLocked {
            timeout: Duration::from_secs(10),
        };
        assert!(locked.is_retryable());
        assert!(!StoreError::NoActiveTransaction.is_retryable());
        assert!(!StoreError::NestedTransaction.is_retryable());
    }

    #[test]
    fn test_graph_error_routes_through_storage() {
        let error: StoreError = GraphError::VertexNotFound(ElementId::from_u64(4)).into();
        assert!(matches!(
            error,
            StoreError::Storage(StorageError::Graph(GraphError::VertexNotFound(_)))
        ));
        assert_eq!(
            error.to_string(),
            "Storage error: Graph error: Vertex not found: 4"
        );
    }
}
