// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Traversal decoration strategies
//!
//! Strategies rewrite the step list of a traversal before it executes.
//! Applying a strategy twice leaves the pipeline unchanged.

use std::fmt;

use super::step::Step;

/// Rewrites the steps of a traversal before execution
pub trait TraversalStrategy: fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, steps: &mut Vec<Step>);
}

/// Inserts a lock upgrade immediately before the first mutating step
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionLockingStrategy;

impl TraversalStrategy for TransactionLockingStrategy {
    fn name(&self) -> &'static str {
        "TransactionLockingStrategy"
    }

    fn apply(&self, steps: &mut Vec<Step>) {
        if steps.contains(&Step::LockForWriting) {
            return;
        }
        if let Some(index) = steps.iter().position(Step::is_mutating) {
            steps.insert(index, Step::LockForWriting);
        }
    }
}

/// Appends a step wrapping every yielded element into its proxy
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementWrappingStrategy;

impl TraversalStrategy for ElementWrappingStrategy {
    fn name(&self) -> &'static str {
        "ElementWrappingStrategy"
    }

    fn apply(&self, steps: &mut Vec<Step>) {
        if steps.last() != Some(&Step::Wrap) {
            steps.retain(|step| *step != Step::Wrap);
            steps.push(Step::Wrap);
        }
    }
}

/// Strategies every traversal started from a transaction uses
pub fn default_strategies() -> Vec<Box<dyn TraversalStrategy>> {
    vec![
        Box::new(TransactionLockingStrategy),
        Box::new(ElementWrappingStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Value;

    fn names(steps: &[Step]) -> Vec<&'static str> {
        steps.iter().map(Step::name).collect()
    }

    #[test]
    fn test_lock_inserted_before_first_mutation_once() {
        let mut steps = vec![
            Step::V(None),
            Step::HasLabel(vec!["resource".into()]),
            Step::Property("p".into(), Value::from(1)),
            Step::Drop,
        ];
        TransactionLockingStrategy.apply(&mut steps);
        TransactionLockingStrategy.apply(&mut steps);
        assert_eq!(
            names(&steps),
            vec!["V", "hasLabel", "lockForWriting", "property", "drop"]
        );
    }

    #[test]
    fn test_read_only_pipeline_untouched_by_locking() {
        let mut steps = vec![Step::V(None), Step::Values(vec![])];
        TransactionLockingStrategy.apply(&mut steps);
        assert_eq!(names(&steps), vec!["V", "values"]);
    }

    #[test]
    fn test_wrap_appended_once() {
        let mut steps = vec![Step::V(None)];
        ElementWrappingStrategy.apply(&mut steps);
        ElementWrappingStrategy.apply(&mut steps);
        assert_eq!(names(&steps), vec!["V", "wrap"]);
    }
}
