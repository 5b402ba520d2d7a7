// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph data structures and error types
//!
//! Defines Vertex and Edge records for the in-memory graph,
//! along with error types for graph operations.

use crate::storage::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Property map of a vertex or edge, ordered by key
pub type Properties = BTreeMap<String, Value>;

/// Error types for graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Vertex not found: {0}")]
    VertexNotFound(ElementId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(ElementId),

    #[error("Vertex already exists: {0}")]
    VertexAlreadyExists(ElementId),

    #[error("Edge already exists: {0}")]
    EdgeAlreadyExists(ElementId),

    #[error("Invalid edge: from vertex {out_vertex} to vertex {in_vertex} - one or both vertices don't exist")]
    InvalidEdge {
        out_vertex: ElementId,
        in_vertex: ElementId,
    },

    #[error("Graph is closed")]
    Closed,
}

/// Error types for storage operations (graph plus on-disk files)
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupted file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::Corrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Identifier of a vertex or an edge. Vertices and edges share one id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    /// Create an id from its raw value
    pub fn from_u64(id: u64) -> Self {
        ElementId(id)
    }

    /// Get the underlying id value
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the element owning a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Vertex(ElementId),
    Edge(ElementId),
}

impl ElementRef {
    pub fn id(&self) -> ElementId {
        match self {
            ElementRef::Vertex(id) | ElementRef::Edge(id) => *id,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Vertex(id) => write!(f, "v[{}]", id),
            ElementRef::Edge(id) => write!(f, "e[{}]", id),
        }
    }
}

/// Edge direction relative to a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Graph vertex with id, label, and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: ElementId,
    pub label: String,
    pub properties: Properties,
}

impl Vertex {
    /// Create a new vertex without properties
    pub fn new(id: ElementId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            properties: Properties::new(),
        }
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Check if vertex has a specific property
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}:{}]", self.id, self.label)
    }
}

/// Graph edge with id, out/in vertices, label, and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ElementId,
    pub label: String,
    pub out_vertex: ElementId,
    pub in_vertex: ElementId,
    pub properties: Properties,
}

impl Edge {
    /// Create a new edge without properties
    pub fn new(
        id: ElementId,
        label: impl Into<String>,
        out_vertex: ElementId,
        in_vertex: ElementId,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            out_vertex,
            in_vertex,
            properties: Properties::new(),
        }
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Check if this edge connects the given vertices (in either direction)
    pub fn connects(&self, v1: ElementId, v2: ElementId) -> bool {
        (self.out_vertex == v1 && self.in_vertex == v2)
            || (self.out_vertex == v2 && self.in_vertex == v1)
    }

    /// The vertex at the other end of this edge, seen from `from`
    pub fn other_end(&self, from: ElementId) -> ElementId {
        if self.out_vertex == from {
            self.in_vertex
        } else {
            self.out_vertex
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "e[{}][{}-{}->{}]",
            self.id, self.out_vertex, self.label, self.in_vertex
        )
    }
}
