// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction-bound vertex proxy

use std::fmt;

use super::{LockingEdge, LockingProperty};
use crate::error::{Result, StoreError};
use crate::storage::{Direction, ElementId, ElementRef, GraphCache, Properties, Value, Vertex};
use crate::txn::{LockingTransaction, MutationEvent};

/// A vertex seen through a transaction
#[derive(Clone, Copy)]
pub struct LockingVertex<'t> {
    tx: &'t LockingTransaction<'t>,
    id: ElementId,
}

impl<'t> LockingVertex<'t> {
    pub(crate) fn new(tx: &'t LockingTransaction<'t>, id: ElementId) -> Self {
        Self { tx, id }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn element(&self) -> ElementRef {
        ElementRef::Vertex(self.id)
    }

    pub fn transaction(&self) -> &'t LockingTransaction<'t> {
        self.tx
    }

    fn not_found(&self) -> StoreError {
        StoreError::ElementNotFound(format!("vertex {}", self.id))
    }

    fn resolve<'a>(&self, graph: &'a GraphCache) -> Result<&'a Vertex> {
        graph.vertex(self.id).ok_or_else(|| self.not_found())
    }

    /// Run `f` against the live vertex
    fn inspect<R>(&self, f: impl FnOnce(&GraphCache, &Vertex) -> R) -> Result<R> {
        self.tx
            .read(|graph| graph.vertex(self.id).map(|vertex| f(graph, vertex)))?
            .ok_or_else(|| self.not_found())
    }

    /// Whether the vertex still exists
    pub fn exists(&self) -> Result<bool> {
        self.tx.read(|graph| graph.vertex(self.id).is_some())
    }

    pub fn label(&self) -> Result<String> {
        self.inspect(|_, vertex| vertex.label.clone())
    }

    /// Detached copy of the vertex as it is now
    pub fn detach(&self) -> Result<Vertex> {
        self.inspect(|_, vertex| vertex.clone())
    }

    /// Value of one property
    pub fn value(&self, key: &str) -> Result<Option<Value>> {
        self.inspect(|_, vertex| vertex.get_property(key).cloned())
    }

    /// Property proxy for `key`; the property need not exist
    pub fn property(&self, key: &str) -> LockingProperty<'t> {
        LockingProperty::new(self.tx, self.element(), key)
    }

    /// Property proxies for `keys`, or for every present property when `keys` is empty
    pub fn properties(&self, keys: &[&str]) -> Result<Vec<LockingProperty<'t>>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| keys.is_empty() || keys.contains(&key.as_str()))
            .map(|key| LockingProperty::new(self.tx, self.element(), key))
            .collect())
    }

    /// All property values
    pub fn values(&self) -> Result<Properties> {
        self.inspect(|_, vertex| vertex.properties.clone())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.inspect(|_, vertex| vertex.properties.keys().cloned().collect())
    }

    /// Incident edges in `direction`, restricted to `labels` unless empty
    pub fn edges(&self, direction: Direction, labels: &[&str]) -> Result<Vec<LockingEdge<'t>>> {
        let ids: Vec<ElementId> = self.inspect(|graph, vertex| {
            graph
                .incident_edges(vertex.id, direction, labels)
                .iter()
                .map(|edge| edge.id)
                .collect()
        })?;
        Ok(ids.into_iter().map(|id| LockingEdge::new(self.tx, id)).collect())
    }

    /// Adjacent vertices in `direction`, restricted to edge `labels` unless empty
    pub fn vertices(&self, direction: Direction, labels: &[&str]) -> Result<Vec<LockingVertex<'t>>> {
        let ids: Vec<ElementId> = self.inspect(|graph, vertex| {
            graph
                .adjacent_vertices(vertex.id, direction, labels)
                .iter()
                .map(|neighbor| neighbor.id)
                .collect()
        })?;
        Ok(ids.into_iter().map(|id| LockingVertex::new(self.tx, id)).collect())
    }

    /// Set a property, recording the previous value
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

    /// Remove a property, returning its value if it was present
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

    /// Create an edge from this vertex to `to`
    pub fn add_edge(&self, label: &str, to: &LockingVertex<'_>) -> Result<LockingEdge<'t>> {
        self.add_edge_with(label, to.id(), Properties::new())
    }

    /// Create an edge from this vertex to the vertex `to`, with initial properties
    pub fn add_edge_with(
        &self,
        label: &str,
        to: ElementId,
        properties: Properties,
    ) -> Result<LockingEdge<'t>> {
        let record = self.tx.write(|graph| {
            self.resolve(graph)?;
            if graph.vertex(to).is_none() {
                return Err(StoreError::ElementNotFound(format!("vertex {}", to)));
            }
            let id = graph.add_edge(label, self.id, to, properties)?;
            graph
                .edge(id)
                .cloned()
                .ok_or_else(|| StoreError::ElementNotFound(format!("edge {}", id)))
        })?;
        let id = record.id;
        self.tx.register_mutation(MutationEvent::edge_created(record))?;
        Ok(LockingEdge::new(self.tx, id))
    }

    /// Remove the vertex together with its incident edges
    pub fn remove(&self) -> Result<()> {
        let (vertex, edges) = self.tx.write(|graph| {
            self.resolve(graph)?;
            Ok(graph.remove_vertex(self.id)?)
        })?;
        for edge in edges {
            self.tx.register_mutation(MutationEvent::edge_deleted(edge))?;
        }
        self.tx.register_mutation(MutationEvent::vertex_deleted(vertex))
    }
}

impl PartialEq for LockingVertex<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LockingVertex<'_> {}

impl fmt::Debug for LockingVertex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockingVertex").field(&self.id).finish()
    }
}

impl fmt::Display for LockingVertex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.id)
    }
}
