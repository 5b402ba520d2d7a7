// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Traversal pipelines over a locking transaction
//!
//! A [`Traversal`] collects steps and runs them eagerly when a terminal
//! operation is called. Before running, its [`TraversalStrategy`]s rewrite
//! the step list: the default pair takes the exclusive lock ahead of the
//! first mutating step and wraps every yielded element into its proxy.
//!
//! Mutating steps always go through the element proxies, so their changes
//! are recorded in the transaction log whether or not wrapping is enabled.
//! Filters and navigation resolve elements by id against the live graph.

mod step;
mod strategy;
mod traverser;

pub use step::Step;
pub use strategy::{
    default_strategies, ElementWrappingStrategy, TransactionLockingStrategy, TraversalStrategy,
};
pub use traverser::{DetachedElement, Traverser};

use std::collections::HashSet;
use std::fmt;

use log::debug;

use crate::element::{LockingEdge, Wrap};
use crate::error::Result;
use crate::storage::{
    Direction, Edge, ElementId, ElementRef, GraphCache, Properties, Value, Vertex,
};
use crate::txn::{DetachedProperty, LockingTransaction};

/// A step pipeline bound to a transaction
pub struct Traversal<'t> {
    tx: &'t LockingTransaction<'t>,
    steps: Vec<Step>,
    strategies: Vec<Box<dyn TraversalStrategy>>,
}

impl<'t> Traversal<'t> {
    /// Pipeline with the default decoration strategies
    pub fn new(tx: &'t LockingTransaction<'t>) -> Self {
        Self::with_strategies(tx, default_strategies())
    }

    pub fn with_strategies(
        tx: &'t LockingTransaction<'t>,
        strategies: Vec<Box<dyn TraversalStrategy>>,
    ) -> Self {
        Self {
            tx,
            steps: Vec::new(),
            strategies,
        }
    }

    /// Register one more strategy, applied after the existing ones
    pub fn with_strategy(mut self, strategy: impl TraversalStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn v(self) -> Self {
        self.push(Step::V(None))
    }

    pub fn v_ids(self, ids: &[ElementId]) -> Self {
        self.push(Step::V(Some(ids.to_vec())))
    }

    pub fn e(self) -> Self {
        self.push(Step::E(None))
    }

    pub fn e_ids(self, ids: &[ElementId]) -> Self {
        self.push(Step::E(Some(ids.to_vec())))
    }

    pub fn has_label(self, labels: &[&str]) -> Self {
        self.push(Step::HasLabel(owned(labels)))
    }

    pub fn has(self, key: &str, value: impl Into<Value>) -> Self {
        self.push(Step::Has(key.to_string(), value.into()))
    }

    pub fn has_key(self, key: &str) -> Self {
        self.push(Step::HasKey(key.to_string()))
    }

    pub fn out(self, labels: &[&str]) -> Self {
        self.push(Step::Vertices(Direction::Out, owned(labels)))
    }

    pub fn in_(self, labels: &[&str]) -> Self {
        self.push(Step::Vertices(Direction::In, owned(labels)))
    }

    pub fn both(self, labels: &[&str]) -> Self {
        self.push(Step::Vertices(Direction::Both, owned(labels)))
    }

    pub fn out_e(self, labels: &[&str]) -> Self {
        self.push(Step::Edges(Direction::Out, owned(labels)))
    }

    pub fn in_e(self, labels: &[&str]) -> Self {
        self.push(Step::Edges(Direction::In, owned(labels)))
    }

    pub fn both_e(self, labels: &[&str]) -> Self {
        self.push(Step::Edges(Direction::Both, owned(labels)))
    }

    pub fn out_v(self) -> Self {
        self.push(Step::EdgeVertex(Direction::Out))
    }

    pub fn in_v(self) -> Self {
        self.push(Step::EdgeVertex(Direction::In))
    }

    pub fn properties(self, keys: &[&str]) -> Self {
        self.push(Step::Properties(owned(keys)))
    }

    pub fn values(self, keys: &[&str]) -> Self {
        self.push(Step::Values(owned(keys)))
    }

    pub fn limit(self, max: usize) -> Self {
        self.push(Step::Limit(max))
    }

    pub fn dedup(self) -> Self {
        self.push(Step::Dedup)
    }

    /// Set `key` on every vertex or edge reaching this step
    pub fn property(self, key: &str, value: impl Into<Value>) -> Self {
        self.push(Step::Property(key.to_string(), value.into()))
    }

    /// Remove every element or property reaching this step
    pub fn drop(self) -> Self {
        self.push(Step::Drop)
    }

    /// Create an edge labelled `label` from every vertex reaching this step to `target`
    pub fn add_e_to(self, label: &str, target: ElementId) -> Self {
        self.push(Step::AddEdgeTo {
            label: label.to_string(),
            target,
        })
    }

    /// Steps as written, before strategies
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps as they will run, after strategies
    pub fn explain(&self) -> Vec<Step> {
        let mut steps = self.steps.clone();
        for strategy in &self.strategies {
            strategy.apply(&mut steps);
        }
        steps
    }

    pub fn to_list(self) -> Result<Vec<Traverser<'t>>> {
        self.execute()
    }

    /// First result, if any
    pub fn next(self) -> Result<Option<Traverser<'t>>> {
        Ok(self.execute()?.into_iter().next())
    }

    pub fn count(self) -> Result<usize> {
        Ok(self.execute()?.len())
    }

    /// Run for side effects only
    pub fn iterate(self) -> Result<()> {
        self.execute().map(|_| ())
    }

    fn execute(self) -> Result<Vec<Traverser<'t>>> {
        let steps = self.explain();
        let tx = self.tx;
        debug!(
            "Executing traversal [{}]",
            steps.iter().map(Step::name).collect::<Vec<_>>().join(", ")
        );

        let mut traversers = Vec::new();
        for step in steps {
            traversers = run_step(tx, step, traversers)?;
        }
        Ok(traversers)
    }
}

impl fmt::Debug for Traversal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("steps", &self.steps)
            .field("strategies", &self.strategies)
            .finish()
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn borrowed(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

fn label_of(graph: &GraphCache, element: ElementRef) -> Option<&str> {
    match element {
        ElementRef::Vertex(id) => graph.vertex(id).map(|v| v.label.as_str()),
        ElementRef::Edge(id) => graph.edge(id).map(|e| e.label.as_str()),
    }
}

fn filter<'t>(
    tx: &'t LockingTransaction<'t>,
    traversers: Vec<Traverser<'t>>,
    keep: impl Fn(&GraphCache, ElementRef) -> bool,
) -> Result<Vec<Traverser<'t>>> {
    tx.read(|graph| {
        traversers
            .into_iter()
            .filter(|t| match t.element_ref() {
                Some(element) => graph.contains(element) && keep(graph, element),
                None => false,
            })
            .collect()
    })
}

fn run_step<'t>(
    tx: &'t LockingTransaction<'t>,
    step: Step,
    traversers: Vec<Traverser<'t>>,
) -> Result<Vec<Traverser<'t>>> {
    match step {
        Step::V(ids) => tx.read(|graph| match ids {
            None => graph.vertices().map(detached_vertex).collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| graph.vertex(*id))
                .map(detached_vertex)
                .collect(),
        }),
        Step::E(ids) => tx.read(|graph| match ids {
            None => graph.edges().map(detached_edge).collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| graph.edge(*id))
                .map(detached_edge)
                .collect(),
        }),
        Step::HasLabel(labels) => filter(tx, traversers, |graph, element| {
            label_of(graph, element).map_or(false, |label| labels.iter().any(|l| l == label))
        }),
        Step::Has(key, value) => filter(tx, traversers, |graph, element| {
            graph.property(element, &key) == Some(&value)
        }),
        Step::HasKey(key) => filter(tx, traversers, |graph, element| {
            graph.property(element, &key).is_some()
        }),
        Step::Vertices(direction, labels) => tx.read(|graph| {
            let labels = borrowed(&labels);
            traversers
                .iter()
                .filter_map(|t| match t.element_ref() {
                    Some(ElementRef::Vertex(id)) => Some(id),
                    _ => None,
                })
                .flat_map(|id| graph.adjacent_vertices(id, direction, &labels))
                .map(detached_vertex)
                .collect()
        }),
        Step::Edges(direction, labels) => tx.read(|graph| {
            let labels = borrowed(&labels);
            traversers
                .iter()
                .filter_map(|t| match t.element_ref() {
                    Some(ElementRef::Vertex(id)) => Some(id),
                    _ => None,
                })
                .flat_map(|id| graph.incident_edges(id, direction, &labels))
                .map(detached_edge)
                .collect()
        }),
        Step::EdgeVertex(direction) => tx.read(|graph| {
            let mut out = Vec::new();
            for t in &traversers {
                let Some(ElementRef::Edge(id)) = t.element_ref() else {
                    continue;
                };
                let Some(edge) = graph.edge(id) else {
                    continue;
                };
                let ends = match direction {
                    Direction::Out => vec![edge.out_vertex],
                    Direction::In => vec![edge.in_vertex],
                    Direction::Both => vec![edge.out_vertex, edge.in_vertex],
                };
                out.extend(ends.into_iter().filter_map(|v| graph.vertex(v)).map(detached_vertex));
            }
            out
        }),
        Step::Properties(keys) => tx.read(|graph| {
            element_properties(graph, &traversers, &keys, |owner, key, value| {
                Traverser::Detached(DetachedElement::Property(DetachedProperty::new(
                    owner,
                    key.to_string(),
                    value.clone(),
                )))
            })
        }),
        Step::Values(keys) => tx.read(|graph| {
            element_properties(graph, &traversers, &keys, |_, _, value| {
                Traverser::Value(value.clone())
            })
        }),
        Step::Limit(max) => {
            let mut traversers = traversers;
            traversers.truncate(max);
            Ok(traversers)
        }
        Step::Dedup => {
            let mut seen = HashSet::new();
            Ok(traversers
                .into_iter()
                .filter(|t| seen.insert(t.key()))
                .collect())
        }
        Step::Property(key, value) => {
            // Another writer may have removed elements while the lock was upgraded
            tx.lock_for_writing()?;
            let mut updated = Vec::with_capacity(traversers.len());
            for t in traversers {
                match t.clone().wrap(tx) {
                    Traverser::Vertex(v) => {
                        if !v.exists()? {
                            continue;
                        }
                        v.set_property(&key, value.clone())?;
                    }
                    Traverser::Edge(e) => {
                        if !e.exists()? {
                            continue;
                        }
                        e.set_property(&key, value.clone())?;
                    }
                    _ => {}
                }
                updated.push(t);
            }
            Ok(updated)
        }
        Step::Drop => {
            tx.lock_for_writing()?;
            for t in traversers {
                match t.wrap(tx) {
                    // Cascades or duplicates may already have removed it.
                    Traverser::Vertex(v) => {
                        if v.exists()? {
                            v.remove()?;
                        }
                    }
                    Traverser::Edge(e) => {
                        if e.exists()? {
                            e.remove()?;
                        }
                    }
                    Traverser::Property(p) => {
                        if p.is_present()? {
                            p.remove()?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Vec::new())
        }
        Step::AddEdgeTo { label, target } => {
            tx.lock_for_writing()?;
            let mut created = Vec::new();
            for t in traversers {
                if let Traverser::Vertex(v) = t.wrap(tx) {
                    if !v.exists()? {
                        continue;
                    }
                    let edge: LockingEdge<'t> = v.add_edge_with(&label, target, Properties::new())?;
                    created.push(Traverser::Detached(DetachedElement::Edge(edge.detach()?)));
                }
            }
            Ok(created)
        }
        Step::LockForWriting => {
            tx.lock_for_writing()?;
            Ok(traversers)
        }
        Step::Wrap => Ok(traversers.into_iter().map(|t| t.wrap(tx)).collect()),
    }
}

fn detached_vertex<'t>(vertex: &Vertex) -> Traverser<'t> {
    Traverser::Detached(DetachedElement::Vertex(vertex.clone()))
}

fn detached_edge<'t>(edge: &Edge) -> Traverser<'t> {
    Traverser::Detached(DetachedElement::Edge(edge.clone()))
}

fn element_properties<'t>(
    graph: &GraphCache,
    traversers: &[Traverser<'t>],
    keys: &[String],
    make: impl Fn(ElementRef, &str, &Value) -> Traverser<'t>,
) -> Vec<Traverser<'t>> {
    let mut out = Vec::new();
    for t in traversers {
        let Some(owner) = t.element_ref() else {
            continue;
        };
        let Some(properties) = graph.properties(owner) else {
            continue;
        };
        for (key, value) in properties {
            if keys.is_empty() || keys.contains(key) {
                out.push(make(owner, key, value));
            }
        }
    }
    out
}
