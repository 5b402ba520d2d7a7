// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Traversal steps

use std::fmt;

use crate::storage::{Direction, ElementId, Value};

/// One stage of a traversal pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Start from vertices (all, or the given ids)
    V(Option<Vec<ElementId>>),
    /// Start from edges (all, or the given ids)
    E(Option<Vec<ElementId>>),
    HasLabel(Vec<String>),
    /// Keep elements whose property `key` equals the value
    Has(String, Value),
    /// Keep elements that have property `key`
    HasKey(String),
    /// Adjacent vertices
    Vertices(Direction, Vec<String>),
    /// Incident edges
    Edges(Direction, Vec<String>),
    /// Endpoint of an edge
    EdgeVertex(Direction),
    /// Property proxies of an element (all when empty)
    Properties(Vec<String>),
    /// Property values of an element (all when empty)
    Values(Vec<String>),
    Limit(usize),
    Dedup,
    /// Set a property on each element
    Property(String, Value),
    /// Remove each element (or property)
    Drop,
    /// Create an edge from each vertex to the target vertex
    AddEdgeTo { label: String, target: ElementId },
    /// Take the exclusive lock before the pipeline mutates anything
    LockForWriting,
    /// Wrap every element into its transaction-bound proxy
    Wrap,
}

impl Step {
    /// Whether executing the step changes the graph
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Step::Property(..) | Step::Drop | Step::AddEdgeTo { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::V(_) => "V",
            Step::E(_) => "E",
            Step::HasLabel(_) => "hasLabel",
            Step::Has(..) => "has",
            Step::HasKey(_) => "hasKey",
            Step::Vertices(Direction::Out, _) => "out",
            Step::Vertices(Direction::In, _) => "in",
            Step::Vertices(Direction::Both, _) => "both",
            Step::Edges(Direction::Out, _) => "outE",
            Step::Edges(Direction::In, _) => "inE",
            Step::Edges(Direction::Both, _) => "bothE",
            Step::EdgeVertex(Direction::Out) => "outV",
            Step::EdgeVertex(Direction::In) => "inV",
            Step::EdgeVertex(Direction::Both) => "bothV",
            Step::Properties(_) => "properties",
            Step::Values(_) => "values",
            Step::Limit(_) => "limit",
            Step::Dedup => "dedup",
            Step::Property(..) => "property",
            Step::Drop => "drop",
            Step::AddEdgeTo { .. } => "addE",
            Step::LockForWriting => "lockForWriting",
            Step::Wrap => "wrap",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_steps() {
        assert!(Step::Drop.is_mutating());
        assert!(Step::Property("p".into(), Value::from(1)).is_mutating());
        assert!(Step::AddEdgeTo {
            label: "contains".into(),
            target: ElementId::from_u64(1)
        }
        .is_mutating());
        assert!(!Step::V(None).is_mutating());
        assert!(!Step::LockForWriting.is_mutating());
        assert!(!Step::Wrap.is_mutating());
    }

    #[test]
    fn test_names() {
        assert_eq!(Step::Vertices(Direction::In, vec![]).to_string(), "in");
        assert_eq!(Step::EdgeVertex(Direction::Out).to_string(), "outV");
    }
}
