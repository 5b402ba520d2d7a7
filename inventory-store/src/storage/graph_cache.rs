// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph engine
//!
//! Provides the embedded, non-transactional graph: ordered maps for
//! vertices/edges, label indices for lookup by type, and adjacency sets for
//! traversal. A graph opened against a directory loads the base snapshot
//! from it and writes the snapshot back when closed. A closed graph holds
//! no data and rejects every mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::persistent;
use super::types::{
    Direction, Edge, ElementId, ElementRef, GraphError, Properties, StorageError, Vertex,
};
use super::value::Value;

/// File name of the base snapshot inside the store directory
pub const SNAPSHOT_FILE: &str = "graph.snapshot";
/// Magic number identifying snapshot files ("INVG")
const SNAPSHOT_MAGIC: u32 = 0x494E_5647;

/// Persisted image of a graph
#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    next_id: u64,
    folded_through: u64,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

/// In-memory graph with indices for fast lookups
#[derive(Debug)]
pub struct GraphCache {
    /// Directory the snapshot is loaded from and written to
    location: Option<PathBuf>,

    open: bool,

    /// Next id handed out to a new vertex or edge
    next_id: u64,

    /// Highest commit log sequence whose effects this graph's snapshot contains
    folded_through: u64,

    vertices: BTreeMap<ElementId, Vertex>,

    edges: BTreeMap<ElementId, Edge>,

    /// Index: label -> ids of vertices with that label
    vertex_labels: HashMap<String, BTreeSet<ElementId>>,

    /// Index: label -> ids of edges with that label
    edge_labels: HashMap<String, BTreeSet<ElementId>>,

    /// Adjacency: vertex id -> outgoing edge ids
    adjacency_out: HashMap<ElementId, BTreeSet<ElementId>>,

    /// Adjacency: vertex id -> incoming edge ids
    adjacency_in: HashMap<ElementId, BTreeSet<ElementId>>,
}

impl GraphCache {
    /// Create a new empty graph that is not backed by a directory
    pub fn new() -> Self {
        Self {
            location: None,
            open: true,
            next_id: 1,
            folded_through: 0,
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            vertex_labels: HashMap::new(),
            edge_labels: HashMap::new(),
            adjacency_out: HashMap::new(),
            adjacency_in: HashMap::new(),
        }
    }

    /// Open a graph backed by `dir`, loading the base snapshot when one exists
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let mut graph = Self::new();
        graph.location = Some(dir.to_path_buf());

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        if !snapshot_path.exists() {
            log::debug!("No snapshot in {}, starting empty", dir.display());
            return Ok(graph);
        }

        let snapshot: GraphSnapshot = persistent::read_file(&snapshot_path, SNAPSHOT_MAGIC)?;
        log::debug!(
            "Loading snapshot with {} vertices and {} edges (folded through commit {})",
            snapshot.vertices.len(),
            snapshot.edges.len(),
            snapshot.folded_through
        );

        for vertex in snapshot.vertices {
            graph.add_vertex_with_id(vertex)?;
        }
        for edge in snapshot.edges {
            graph.add_edge_with_id(edge)?;
        }
        graph.next_id = graph.next_id.max(snapshot.next_id);
        graph.folded_through = snapshot.folded_through;

        Ok(graph)
    }

    /// Write the snapshot (if directory-backed) and release all data
    pub fn close(&mut self) -> Result<(), StorageError> {
        if !self.open {
            return Ok(());
        }

        if let Some(dir) = &self.location {
            let snapshot = GraphSnapshot {
                next_id: self.next_id,
                folded_through: self.folded_through,
                vertices: self.vertices.values().cloned().collect(),
                edges: self.edges.values().cloned().collect(),
            };
            persistent::write_file(&dir.join(SNAPSHOT_FILE), SNAPSHOT_MAGIC, &snapshot)?;
            log::debug!(
                "Wrote snapshot with {} vertices and {} edges to {}",
                snapshot.vertices.len(),
                snapshot.edges.len(),
                dir.display()
            );
        }

        self.close_discarding();
        Ok(())
    }

    /// Release all data without writing a snapshot
    pub fn close_discarding(&mut self) {
        self.clear();
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Directory backing this graph, if any
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn folded_through(&self) -> u64 {
        self.folded_through
    }

    /// Record that the effects of every segment up to `sequence` are contained in this graph
    pub fn set_folded_through(&mut self, sequence: u64) {
        self.folded_through = self.folded_through.max(sequence);
    }

    fn ensure_open(&self) -> Result<(), GraphError> {
        if self.open {
            Ok(())
        } else {
            Err(GraphError::Closed)
        }
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId::from_u64(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a vertex, allocating a fresh id
    pub fn add_vertex(
        &mut self,
        label: &str,
        properties: Properties,
    ) -> Result<ElementId, GraphError> {
        self.ensure_open()?;
        let id = self.allocate_id();
        self.add_vertex_with_id(Vertex {
            id,
            label: label.to_string(),
            properties,
        })?;
        Ok(id)
    }

    /// Add a vertex with a caller-supplied id (replay, rollback and snapshot loading)
    pub fn add_vertex_with_id(&mut self, vertex: Vertex) -> Result<(), GraphError> {
        self.ensure_open()?;
        if self.vertices.contains_key(&vertex.id) || self.edges.contains_key(&vertex.id) {
            return Err(GraphError::VertexAlreadyExists(vertex.id));
        }

        self.vertex_labels
            .entry(vertex.label.clone())
            .or_default()
            .insert(vertex.id);

        self.adjacency_out.insert(vertex.id, BTreeSet::new());
        self.adjacency_in.insert(vertex.id, BTreeSet::new());

        self.next_id = self.next_id.max(vertex.id.id() + 1);
        self.vertices.insert(vertex.id, vertex);

        Ok(())
    }

    /// Add an edge between two existing vertices, allocating a fresh id
    pub fn add_edge(
        &mut self,
        label: &str,
        out_vertex: ElementId,
        in_vertex: ElementId,
        properties: Properties,
    ) -> Result<ElementId, GraphError> {
        self.ensure_open()?;
        self.check_endpoints(out_vertex, in_vertex)?;
        let id = self.allocate_id();
        self.add_edge_with_id(Edge {
            id,
            label: label.to_string(),
            out_vertex,
            in_vertex,
            properties,
        })?;
        Ok(id)
    }

    /// Add an edge with a caller-supplied id
    pub fn add_edge_with_id(&mut self, edge: Edge) -> Result<(), GraphError> {
        self.ensure_open()?;
        if self.edges.contains_key(&edge.id) || self.vertices.contains_key(&edge.id) {
            return Err(GraphError::EdgeAlreadyExists(edge.id));
        }
        self.check_endpoints(edge.out_vertex, edge.in_vertex)?;

        self.edge_labels
            .entry(edge.label.clone())
            .or_default()
            .insert(edge.id);

        if let Some(outgoing) = self.adjacency_out.get_mut(&edge.out_vertex) {
            outgoing.insert(edge.id);
        }
        if let Some(incoming) = self.adjacency_in.get_mut(&edge.in_vertex) {
            incoming.insert(edge.id);
        }

        self.next_id = self.next_id.max(edge.id.id() + 1);
        self.edges.insert(edge.id, edge);

        Ok(())
    }

    fn check_endpoints(&self, out_vertex: ElementId, in_vertex: ElementId) -> Result<(), GraphError> {
        if self.vertices.contains_key(&out_vertex) && self.vertices.contains_key(&in_vertex) {
            Ok(())
        } else {
            Err(GraphError::InvalidEdge {
                out_vertex,
                in_vertex,
            })
        }
    }

    /// Get a vertex by id
    pub fn vertex(&self, id: ElementId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    /// Get an edge by id
    pub fn edge(&self, id: ElementId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All vertices in ascending id order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// All edges in ascending id order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get all vertices with a specific label
    pub fn vertices_by_label(&self, label: &str) -> Vec<&Vertex> {
        self.vertex_labels
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.vertices.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges with a specific label
    pub fn edges_by_label(&self, label: &str) -> Vec<&Edge> {
        self.edge_labels
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edges incident to `vertex` in `direction`, optionally restricted to `labels`
    pub fn incident_edges(
        &self,
        vertex: ElementId,
        direction: Direction,
        labels: &[&str],
    ) -> Vec<&Edge> {
        let mut ids: BTreeSet<ElementId> = BTreeSet::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(outgoing) = self.adjacency_out.get(&vertex) {
                ids.extend(outgoing.iter().copied());
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(incoming) = self.adjacency_in.get(&vertex) {
                ids.extend(incoming.iter().copied());
            }
        }

        ids.iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| labels.is_empty() || labels.contains(&edge.label.as_str()))
            .collect()
    }

    /// Vertices adjacent to `vertex` in `direction`, optionally restricted to edge `labels`
    pub fn adjacent_vertices(
        &self,
        vertex: ElementId,
        direction: Direction,
        labels: &[&str],
    ) -> Vec<&Vertex> {
        let mut neighbors = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            for edge in self.incident_edges(vertex, Direction::Out, labels) {
                if let Some(v) = self.vertices.get(&edge.in_vertex) {
                    neighbors.push(v);
                }
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            for edge in self.incident_edges(vertex, Direction::In, labels) {
                if let Some(v) = self.vertices.get(&edge.out_vertex) {
                    neighbors.push(v);
                }
            }
        }
        neighbors
    }

    /// Check whether the referenced element exists
    pub fn contains(&self, element: ElementRef) -> bool {
        match element {
            ElementRef::Vertex(id) => self.vertices.contains_key(&id),
            ElementRef::Edge(id) => self.edges.contains_key(&id),
        }
    }

    /// Properties of the referenced element
    pub fn properties(&self, element: ElementRef) -> Option<&Properties> {
        match element {
            ElementRef::Vertex(id) => self.vertices.get(&id).map(|v| &v.properties),
            ElementRef::Edge(id) => self.edges.get(&id).map(|e| &e.properties),
        }
    }

    /// Get one property of the referenced element
    pub fn property(&self, element: ElementRef, key: &str) -> Option<&Value> {
        self.properties(element).and_then(|props| props.get(key))
    }

    fn properties_mut(&mut self, element: ElementRef) -> Result<&mut Properties, GraphError> {
        match element {
            ElementRef::Vertex(id) => self
                .vertices
                .get_mut(&id)
                .map(|v| &mut v.properties)
                .ok_or(GraphError::VertexNotFound(id)),
            ElementRef::Edge(id) => self
                .edges
                .get_mut(&id)
                .map(|e| &mut e.properties)
                .ok_or(GraphError::EdgeNotFound(id)),
        }
    }

    /// Set a property, returning the value it replaced
    pub fn set_property(
        &mut self,
        element: ElementRef,
        key: &str,
        value: Value,
    ) -> Result<Option<Value>, GraphError> {
        self.ensure_open()?;
        Ok(self.properties_mut(element)?.insert(key.to_string(), value))
    }

    /// Remove a property, returning the removed value
    pub fn remove_property(
        &mut self,
        element: ElementRef,
        key: &str,
    ) -> Result<Option<Value>, GraphError> {
        self.ensure_open()?;
        Ok(self.properties_mut(element)?.remove(key))
    }

    /// Remove a vertex and all its incident edges
    ///
    /// Returns the removed vertex together with the removed edges.
    pub fn remove_vertex(&mut self, id: ElementId) -> Result<(Vertex, Vec<Edge>), GraphError> {
        self.ensure_open()?;
        if !self.vertices.contains_key(&id) {
            return Err(GraphError::VertexNotFound(id));
        }

        let incident: Vec<ElementId> = self
            .incident_edges(id, Direction::Both, &[])
            .iter()
            .map(|edge| edge.id)
            .collect();

        let mut removed_edges = Vec::with_capacity(incident.len());
        for edge_id in incident {
            removed_edges.push(self.remove_edge(edge_id)?);
        }

        let vertex = self
            .vertices
            .remove(&id)
            .ok_or(GraphError::VertexNotFound(id))?;

        if let Some(ids) = self.vertex_labels.get_mut(&vertex.label) {
            ids.remove(&id);
            if ids.is_empty() {
                self.vertex_labels.remove(&vertex.label);
            }
        }
        self.adjacency_out.remove(&id);
        self.adjacency_in.remove(&id);

        Ok((vertex, removed_edges))
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, id: ElementId) -> Result<Edge, GraphError> {
        self.ensure_open()?;
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;

        if let Some(ids) = self.edge_labels.get_mut(&edge.label) {
            ids.remove(&id);
            if ids.is_empty() {
                self.edge_labels.remove(&edge.label);
            }
        }
        if let Some(outgoing) = self.adjacency_out.get_mut(&edge.out_vertex) {
            outgoing.remove(&id);
        }
        if let Some(incoming) = self.adjacency_in.get_mut(&edge.in_vertex) {
            incoming.remove(&id);
        }

        Ok(edge)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if the graph is empty (no vertices and no edges)
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            vertex_count: self.vertices.len(),
            edge_count: self.edges.len(),
            vertex_label_count: self.vertex_labels.len(),
            edge_label_count: self.edge_labels.len(),
        }
    }

    /// Clear all data from the graph
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.vertex_labels.clear();
        self.edge_labels.clear();
        self.adjacency_out.clear();
        self.adjacency_in.clear();
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub vertex_label_count: usize,
    pub edge_label_count: usize,
}
