// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction-bound edge proxy

use std::fmt;

use super::{LockingProperty, LockingVertex};
use crate::error::{Result, StoreError};
use crate::storage::{Direction, Edge, ElementId, ElementRef, GraphCache, Properties, Value};
use crate::txn::{LockingTransaction, MutationEvent};

/// An edge seen through a transaction
#[derive(Clone, Copy)]
pub struct LockingEdge<'t> {
    tx: &'t LockingTransaction<'t>,
    id: ElementId,
}

impl<'t> LockingEdge<'t> {
    pub(crate) fn new(tx: &'t LockingTransaction<'t>, id: ElementId) -> Self {
        Self { tx, id }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn element(&self) -> ElementRef {
        ElementRef::Edge(self.id)
    }

    fn not_found(&self) -> StoreError {
        StoreError::ElementNotFound(format!("edge {}", self.id))
    }

    fn resolve<'a>(&self, graph: &'a GraphCache) -> Result<&'a Edge> {
        graph.edge(self.id).ok_or_else(|| self.not_found())
    }

    fn inspect<R>(&self, f: impl FnOnce(&Edge) -> R) -> Result<R> {
        self.tx
            .read(|graph| graph.edge(self.id).map(f))?
            .ok_or_else(|| self.not_found())
    }

    pub fn exists(&self) -> Result<bool> {
        self.tx.read(|graph| graph.edge(self.id).is_some())
    }

    pub fn label(&self) -> Result<String> {
        self.inspect(|edge| edge.label.clone())
    }

    pub fn detach(&self) -> Result<Edge> {
        self.inspect(|edge| edge.clone())
    }

    /// The vertex this edge starts at
    pub fn out_vertex(&self) -> Result<LockingVertex<'t>> {
        let id = self.inspect(|edge| edge.out_vertex)?;
        Ok(LockingVertex::new(self.tx, id))
    }

    /// The vertex this edge points to
    pub fn in_vertex(&self) -> Result<LockingVertex<'t>> {
        let id = self.inspect(|edge| edge.in_vertex)?;
        Ok(LockingVertex::new(self.tx, id))
    }

    /// Endpoints selected by `direction`: out, in, or both (out first)
    pub fn vertices(&self, direction: Direction) -> Result<Vec<LockingVertex<'t>>> {
        let (out_vertex, in_vertex) = self.inspect(|edge| (edge.out_vertex, edge.in_vertex))?;
        let ids = match direction {
            Direction::Out => vec![out_vertex],
            Direction::In => vec![in_vertex],
            Direction::Both => vec![out_vertex, in_vertex],
        };
        Ok(ids.into_iter().map(|id| LockingVertex::new(self.tx, id)).collect())
    }

    pub fn value(&self, key: &str) -> Result<Option<Value>> {
        self.inspect(|edge| edge.get_property(key).cloned())
    }

    pub fn property(&self, key: &str) -> LockingProperty<'t> {
        LockingProperty::new(self.tx, self.element(), key)
    }

    pub fn properties(&self, keys: &[&str]) -> Result<Vec<LockingProperty<'t>>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| keys.is_empty() || keys.contains(&key.as_str()))
            .map(|key| LockingProperty::new(self.tx, self.element(), key))
            .collect())
    }

    pub fn values(&self) -> Result<Properties> {
        self.inspect(|edge| edge.properties.clone())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.inspect(|edge| edge.properties.keys().cloned().collect())
    }

    pub fn set_property(&self, key: &str, value: impl Into<Value>) -> Result<LockingProperty<'t>> {
        let value = value.into();
        let owner = self.element();
        let old = self.tx.write(|graph| {
            self.resolve(graph)?;
            Ok(graph.set_property(owner, key, value.clone())?)
        })?;
        self.tx
            .register_mutation(MutationEvent::property_changed(owner, key, old, Some(value)))?;
        Ok(LockingProperty::new(self.tx, owner, key))
    }

    pub fn remove_property(&self, key: &str) -> Result<Option<Value>> {
        let owner = self.element();
        let old = self.tx.write(|graph| {
            self.resolve(graph)?;
            Ok(graph.remove_property(owner, key)?)
        })?;
        if let Some(value) = &old {
            self.tx.register_mutation(MutationEvent::property_changed(
                owner,
                key,
                Some(value.clone()),
                None,
            ))?;
        }
        Ok(old)
    }

    pub fn remove(&self) -> Result<()> {
        let edge = self.tx.write(|graph| {
            self.resolve(graph)?;
            Ok(graph.remove_edge(self.id)?)
        })?;
        self.tx.register_mutation(MutationEvent::edge_deleted(edge))
    }
}

impl PartialEq for LockingEdge<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LockingEdge<'_> {}

impl fmt::Debug for LockingEdge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockingEdge").field(&self.id).finish()
    }
}

impl fmt::Display for LockingEdge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.id)
    }
}
