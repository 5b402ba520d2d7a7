// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Objects flowing through a traversal pipeline

use std::fmt;

use crate::element::{LockingEdge, LockingProperty, LockingVertex, Wrap};
use crate::storage::{Edge, ElementRef, Value, Vertex};
use crate::txn::{DetachedProperty, LockingTransaction};

/// Element copied out of the graph, not bound to a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum DetachedElement {
    Vertex(Vertex),
    Edge(Edge),
    Property(DetachedProperty),
}

/// One item of a traversal result
#[derive(Debug, Clone)]
pub enum Traverser<'t> {
    Vertex(LockingVertex<'t>),
    Edge(LockingEdge<'t>),
    Property(LockingProperty<'t>),
    Value(Value),
    /// Element not yet wrapped into its proxy
    Detached(DetachedElement),
}

/// Identity used by `dedup`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TraverserKey {
    Element(ElementRef),
    Property(ElementRef, String),
    Value(Value),
}

impl<'t> Traverser<'t> {
    /// The vertex or edge this traverser stands for
    pub fn element_ref(&self) -> Option<ElementRef> {
        match self {
            Traverser::Vertex(v) => Some(v.element()),
            Traverser::Edge(e) => Some(e.element()),
            Traverser::Detached(DetachedElement::Vertex(v)) => Some(ElementRef::Vertex(v.id)),
            Traverser::Detached(DetachedElement::Edge(e)) => Some(ElementRef::Edge(e.id)),
            Traverser::Property(_)
            | Traverser::Value(_)
            | Traverser::Detached(DetachedElement::Property(_)) => None,
        }
    }

    pub(crate) fn key(&self) -> TraverserKey {
        match self {
            Traverser::Property(p) => TraverserKey::Property(p.owner(), p.key().to_string()),
            Traverser::Detached(DetachedElement::Property(p)) => {
                TraverserKey::Property(p.owner, p.key.clone())
            }
            Traverser::Value(value) => TraverserKey::Value(value.clone()),
            Traverser::Vertex(v) => TraverserKey::Element(v.element()),
            Traverser::Edge(e) => TraverserKey::Element(e.element()),
            Traverser::Detached(DetachedElement::Vertex(v)) => {
                TraverserKey::Element(ElementRef::Vertex(v.id))
            }
            Traverser::Detached(DetachedElement::Edge(e)) => {
                TraverserKey::Element(ElementRef::Edge(e.id))
            }
        }
    }

    pub fn as_vertex(&self) -> Option<LockingVertex<'t>> {
        match self {
            Traverser::Vertex(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<LockingEdge<'t>> {
        match self {
            Traverser::Edge(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&LockingProperty<'t>> {
        match self {
            Traverser::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Traverser::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Traverser::Detached(_))
    }
}

impl<'t> Wrap<'t> for Traverser<'t> {
    type Wrapped = Traverser<'t>;

    fn wrap(self, tx: &'t LockingTransaction<'t>) -> Traverser<'t> {
        match self {
            Traverser::Detached(DetachedElement::Vertex(v)) => Traverser::Vertex(v.wrap(tx)),
            Traverser::Detached(DetachedElement::Edge(e)) => Traverser::Edge(e.wrap(tx)),
            Traverser::Detached(DetachedElement::Property(p)) => Traverser::Property(p.wrap(tx)),
            wrapped => wrapped,
        }
    }
}

impl fmt::Display for Traverser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traverser::Vertex(v) => write!(f, "{}", v),
            Traverser::Edge(e) => write!(f, "{}", e),
            Traverser::Property(p) => write!(f, "{}", p),
            Traverser::Value(value) => write!(f, "{}", value),
            Traverser::Detached(DetachedElement::Vertex(v)) => write!(f, "{}", v),
            Traverser::Detached(DetachedElement::Edge(e)) => write!(f, "{}", e),
            Traverser::Detached(DetachedElement::Property(p)) => {
                write!(f, "p[{}.{}]", p.owner, p.key)
            }
        }
    }
}
