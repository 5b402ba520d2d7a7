// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction state management
//!
//! Lifecycle states of a locking transaction and the per-thread registry of
//! open transactions used to reject nested opens.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction lifecycle states
///
/// `Closed -> OpenRead -> [OpenWrite] -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No lock held
    Closed,
    /// Shared lock held
    OpenRead,
    /// Exclusive lock held
    OpenWrite,
}

impl TransactionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, TransactionState::Closed)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Closed => write!(f, "closed"),
            TransactionState::OpenRead => write!(f, "open (read)"),
            TransactionState::OpenWrite => write!(f, "open (write)"),
        }
    }
}

/// Process-unique identifier of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

impl StoreId {
    pub fn next() -> Self {
        StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store_{}", self.0)
    }
}

thread_local! {
    /// Stores for which the current thread has an open transaction
    static OPEN_ON_THREAD: RefCell<HashSet<StoreId>> = RefCell::new(HashSet::new());
}

/// Mark `store` as having an open transaction on this thread.
/// Returns false when one is already registered.
pub(crate) fn register_open(store: StoreId) -> bool {
    OPEN_ON_THREAD.with(|open| open.borrow_mut().insert(store))
}

pub(crate) fn unregister_open(store: StoreId) {
    OPEN_ON_THREAD.with(|open| {
        open.borrow_mut().remove(&store);
    });
}

pub(crate) fn is_open_on_thread(store: StoreId) -> bool {
    OPEN_ON_THREAD.with(|open| open.borrow().contains(&store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rejects_second_registration() {
        let store = StoreId::next();
        assert!(register_open(store));
        assert!(!register_open(store));
        assert!(is_open_on_thread(store));

        unregister_open(store);
        assert!(!is_open_on_thread(store));
        assert!(register_open(store));
        unregister_open(store);
    }

    #[test]
    fn test_registry_is_per_thread() {
        let store = StoreId::next();
        assert!(register_open(store));

        let other = std::thread::spawn(move || register_open(store))
            .join()
            .unwrap();
        assert!(other);

        unregister_open(store);
    }

    #[test]
    fn test_store_ids_are_unique() {
        assert_ne!(StoreId::next(), StoreId::next());
    }
}
