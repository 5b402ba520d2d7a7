// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Element interception layer
//!
//! Vertices, edges and properties handed out by a transaction are proxies
//! that borrow the transaction and hold only an element id. Reads resolve
//! the id against the live graph. Every mutation first takes the exclusive
//! lock, captures the detached state before the change, applies it and
//! registers the before/after pair with the transaction.

mod edge;
mod property;
mod vertex;

pub use edge::LockingEdge;
pub use property::LockingProperty;
pub use vertex::LockingVertex;

use crate::storage::{Edge, Vertex};
use crate::txn::{DetachedProperty, LockingTransaction};

/// Wrap a graph element into its transaction-bound proxy.
///
/// Wrapping an element that is already a proxy returns it unchanged.
pub trait Wrap<'t> {
    type Wrapped;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> Self::Wrapped;
}

impl<'t> Wrap<'t> for Vertex {
    type Wrapped = LockingVertex<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> LockingVertex<'t> {
        LockingVertex::new(tx, self.id)
    }
}

impl<'t> Wrap<'t> for &Vertex {
    type Wrapped = LockingVertex<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> LockingVertex<'t> {
        LockingVertex::new(tx, self.id)
    }
}

impl<'t> Wrap<'t> for Edge {
    type Wrapped = LockingEdge<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> LockingEdge<'t> {
        LockingEdge::new(tx, self.id)
    }
}

impl<'t> Wrap<'t> for &Edge {
    type Wrapped = LockingEdge<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> LockingEdge<'t> {
        LockingEdge::new(tx, self.id)
    }
}

impl<'t> Wrap<'t> for DetachedProperty {
    type Wrapped = LockingProperty<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> LockingProperty<'t> {
        LockingProperty::new(tx, self.owner, self.key)
    }
}

impl<'t> Wrap<'t> for LockingVertex<'t> {
    type Wrapped = LockingVertex<'t>;

    fn wrap(self, _tx: &'t LockingTransaction<'t>) -> LockingVertex<'t> {
        self
    }
}

impl<'t> Wrap<'t> for LockingEdge<'t> {
    type Wrapped = LockingEdge<'t>;

    fn wrap(self, _tx: &'t LockingTransaction<'t>) -> LockingEdge<'t> {
        self
    }
}

impl<'t> Wrap<'t> for LockingProperty<'t> {
    type Wrapped = LockingProperty<'t>;

    fn wrap(self, _tx: &'t LockingTransaction<'t>) -> LockingProperty<'t> {
        self
    }
}
