// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Mutation logging for rollback and replay
//!
//! Every intercepted change is recorded as a [`MutationEvent`] holding
//! detached before/after snapshots. The same log is reverted newest-first on
//! rollback and re-applied oldest-first when a committed segment is replayed.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::{Edge, ElementRef, GraphCache, GraphError, Properties, Value, Vertex};

/// Detached copy of a vertex
pub type DetachedVertex = Vertex;

/// Detached copy of an edge
pub type DetachedEdge = Edge;

/// Detached copy of a single property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedProperty {
    pub owner: ElementRef,
    pub key: String,
    pub value: Value,
}

impl DetachedProperty {
    pub fn new(owner: ElementRef, key: impl Into<String>, value: Value) -> Self {
        Self {
            owner,
            key: key.into(),
            value,
        }
    }
}

/// Kind of change a mutation event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// A single recorded change. `old == None` is a create, `new == None` a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationEvent {
    Vertex {
        old: Option<DetachedVertex>,
        new: Option<DetachedVertex>,
    },
    Edge {
        old: Option<DetachedEdge>,
        new: Option<DetachedEdge>,
    },
    Property {
        old: Option<DetachedProperty>,
        new: Option<DetachedProperty>,
    },
}

impl MutationEvent {
    pub fn vertex_created(vertex: DetachedVertex) -> Self {
        MutationEvent::Vertex {
            old: None,
            new: Some(vertex),
        }
    }

    pub fn vertex_deleted(vertex: DetachedVertex) -> Self {
        MutationEvent::Vertex {
            old: Some(vertex),
            new: None,
        }
    }

    pub fn edge_created(edge: DetachedEdge) -> Self {
        MutationEvent::Edge {
            old: None,
            new: Some(edge),
        }
    }

    pub fn edge_deleted(edge: DetachedEdge) -> Self {
        MutationEvent::Edge {
            old: Some(edge),
            new: None,
        }
    }

    /// Property change on `owner`; a missing `old` or `new` value marks a create or removal
    pub fn property_changed(
        owner: ElementRef,
        key: &str,
        old: Option<Value>,
        new: Option<Value>,
    ) -> Self {
        MutationEvent::Property {
            old: old.map(|value| DetachedProperty::new(owner, key, value)),
            new: new.map(|value| DetachedProperty::new(owner, key, value)),
        }
    }

    pub fn kind(&self) -> MutationKind {
        let (has_old, has_new) = match self {
            MutationEvent::Vertex { old, new } => (old.is_some(), new.is_some()),
            MutationEvent::Edge { old, new } => (old.is_some(), new.is_some()),
            MutationEvent::Property { old, new } => (old.is_some(), new.is_some()),
        };
        match (has_old, has_new) {
            (false, _) => MutationKind::Create,
            (true, false) => MutationKind::Delete,
            (true, true) => MutationKind::Update,
        }
    }

    /// Short description used in logs and CLI output
    pub fn describe(&self) -> String {
        let kind = match self.kind() {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        };
        match self {
            MutationEvent::Vertex { old, new } => {
                let id = new.as_ref().or(old.as_ref()).map(|v| v.id.to_string());
                format!("{} vertex {}", kind, id.unwrap_or_default())
            }
            MutationEvent::Edge { old, new } => {
                let id = new.as_ref().or(old.as_ref()).map(|e| e.id.to_string());
                format!("{} edge {}", kind, id.unwrap_or_default())
            }
            MutationEvent::Property { old, new } => match new.as_ref().or(old.as_ref()) {
                Some(p) => format!("{} property {}.{}", kind, p.owner, p.key),
                None => format!("{} property", kind),
            },
        }
    }

    /// Apply this event forward against `graph` (commit log replay)
    pub fn apply(&self, graph: &mut GraphCache) -> Result<()> {
        match self {
            MutationEvent::Vertex { old, new } => match (old, new) {
                (None, Some(vertex)) => graph.add_vertex_with_id(vertex.clone())?,
                (Some(vertex), None) => {
                    graph.remove_vertex(vertex.id)?;
                }
                (Some(_), Some(vertex)) => restore_properties(
                    graph,
                    ElementRef::Vertex(vertex.id),
                    &vertex.properties,
                )?,
                (None, None) => {}
            },
            MutationEvent::Edge { old, new } => match (old, new) {
                (None, Some(edge)) => add_edge(graph, edge)?,
                (Some(edge), None) => {
                    graph.remove_edge(edge.id)?;
                }
                (Some(_), Some(edge)) => {
                    restore_properties(graph, ElementRef::Edge(edge.id), &edge.properties)?
                }
                (None, None) => {}
            },
            MutationEvent::Property { old, new } => match (old, new) {
                (_, Some(p)) => {
                    owner_exists(graph, p.owner)?;
                    graph.set_property(p.owner, &p.key, p.value.clone())?;
                }
                (Some(p), None) => {
                    owner_exists(graph, p.owner)?;
                    graph.remove_property(p.owner, &p.key)?;
                }
                (None, None) => {}
            },
        }
        Ok(())
    }

    /// Undo this event against `graph` (rollback)
    pub fn revert(&self, graph: &mut GraphCache) -> Result<()> {
        match self {
            MutationEvent::Vertex { old, new } => match (old, new) {
                (None, Some(vertex)) => {
                    graph.remove_vertex(vertex.id)?;
                }
                (Some(vertex), None) => graph.add_vertex_with_id(vertex.clone())?,
                (Some(vertex), Some(_)) => restore_properties(
                    graph,
                    ElementRef::Vertex(vertex.id),
                    &vertex.properties,
                )?,
                (None, None) => {}
            },
            MutationEvent::Edge { old, new } => match (old, new) {
                (None, Some(edge)) => {
                    graph.remove_edge(edge.id)?;
                }
                (Some(edge), None) => add_edge(graph, edge)?,
                (Some(edge), Some(_)) => {
                    restore_properties(graph, ElementRef::Edge(edge.id), &edge.properties)?
                }
                (None, None) => {}
            },
            MutationEvent::Property { old, new } => match (old, new) {
                (Some(p), _) => {
                    owner_exists(graph, p.owner)?;
                    graph.set_property(p.owner, &p.key, p.value.clone())?;
                }
                (None, Some(p)) => {
                    owner_exists(graph, p.owner)?;
                    graph.remove_property(p.owner, &p.key)?;
                }
                (None, None) => {}
            },
        }
        Ok(())
    }
}

fn add_edge(graph: &mut GraphCache, edge: &DetachedEdge) -> Result<()> {
    match graph.add_edge_with_id(edge.clone()) {
        Err(GraphError::InvalidEdge { .. }) => Err(StoreError::DanglingReference(format!(
            "{} references a vertex that does not exist",
            edge
        ))),
        other => Ok(other?),
    }
}

fn owner_exists(graph: &GraphCache, owner: ElementRef) -> Result<()> {
    if graph.contains(owner) {
        Ok(())
    } else {
        Err(StoreError::DanglingReference(format!(
            "property owner {} does not exist",
            owner
        )))
    }
}

fn restore_properties(graph: &mut GraphCache, element: ElementRef, properties: &Properties) -> Result<()> {
    let current: Vec<String> = graph
        .properties(element)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    for key in current {
        if !properties.contains_key(&key) {
            graph.remove_property(element, &key)?;
        }
    }
    for (key, value) in properties {
        graph.set_property(element, key, value.clone())?;
    }
    Ok(())
}

/// Ordered log of the mutations made by one transaction
#[derive(Debug, Clone, Default)]
pub struct MutationLog {
    events: Vec<MutationEvent>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: MutationEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[MutationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Revert every event newest-first, leaving the log empty.
    /// Stops at the first event that cannot be reverted.
    pub fn revert_all(&mut self, graph: &mut GraphCache) -> Result<usize> {
        let events = std::mem::take(&mut self.events);
        let count = events.len();
        for event in events.iter().rev() {
            log::debug!("Reverting: {}", event.describe());
            event.revert(graph)?;
        }
        Ok(count)
    }
}

/// Apply `events` oldest-first
pub fn apply_all(events: &[MutationEvent], graph: &mut GraphCache) -> Result<()> {
    for event in events {
        event.apply(graph)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ElementId;

    fn vertex(id: u64, label: &str) -> Vertex {
        Vertex::new(ElementId::from_u64(id), label)
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            MutationEvent::vertex_created(vertex(1, "tenant")).kind(),
            MutationKind::Create
        );
        assert_eq!(
            MutationEvent::vertex_deleted(vertex(1, "tenant")).kind(),
            MutationKind::Delete
        );
        let owner = ElementRef::Vertex(ElementId::from_u64(1));
        assert_eq!(
            MutationEvent::property_changed(owner, "p", Some(Value::from(1)), Some(Value::from(2)))
                .kind(),
            MutationKind::Update
        );
    }

    #[test]
    fn test_revert_is_lifo() {
        let mut graph = GraphCache::new();
        let mut log = MutationLog::new();

        // create v1, set p=1, set p=2
        let v = graph.add_vertex("metric", Properties::new()).unwrap();
        let record = graph.vertex(v).unwrap().clone();
        log.record(MutationEvent::vertex_created(record));

        let owner = ElementRef::Vertex(v);
        graph.set_property(owner, "p", Value::from(1)).unwrap();
        log.record(MutationEvent::property_changed(owner, "p", None, Some(Value::from(1))));
        graph.set_property(owner, "p", Value::from(2)).unwrap();
        log.record(MutationEvent::property_changed(
            owner,
            "p",
            Some(Value::from(1)),
            Some(Value::from(2)),
        ));

        assert_eq!(log.revert_all(&mut graph).unwrap(), 3);
        assert!(log.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_revert_edge_with_missing_endpoint_is_dangling() {
        let mut graph = GraphCache::new();
        let edge = Edge::new(
            ElementId::from_u64(3),
            "contains",
            ElementId::from_u64(1),
            ElementId::from_u64(2),
        );
        let result = MutationEvent::edge_deleted(edge).revert(&mut graph);
        assert!(matches!(result, Err(StoreError::DanglingReference(_))));
    }

    #[test]
    fn test_apply_replays_forward() {
        let mut graph = GraphCache::new();
        let a = vertex(1, "tenant");
        let b = vertex(2, "environment");
        let edge = Edge::new(ElementId::from_u64(3), "contains", a.id, b.id);
        let owner = ElementRef::Vertex(a.id);

        let events = vec![
            MutationEvent::vertex_created(a.clone()),
            MutationEvent::vertex_created(b.clone()),
            MutationEvent::edge_created(edge.clone()),
            MutationEvent::property_changed(owner, "name", None, Some(Value::from("acme"))),
            MutationEvent::edge_deleted(edge),
            MutationEvent::vertex_deleted(b),
        ];
        apply_all(&events, &mut graph).unwrap();

        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.property(owner, "name"), Some(&Value::from("acme")));
    }

    #[test]
    fn test_events_survive_bincode() {
        let owner = ElementRef::Edge(ElementId::from_u64(9));
        let event = MutationEvent::property_changed(owner, "weight", Some(Value::from(1.5)), None);
        let bytes = bincode::serialize(&event).unwrap();
        let back: MutationEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.describe(), "delete property e[9].weight");
    }
}
