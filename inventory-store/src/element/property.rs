// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction-bound property proxy

use std::fmt;

use crate::error::{Result, StoreError};
use crate::storage::{ElementRef, Value};
use crate::txn::{DetachedProperty, LockingTransaction, MutationEvent};

/// A single property of a vertex or edge, seen through a transaction.
///
/// The proxy names a key on an owner; the property itself may be absent.
#[derive(Clone)]
pub struct LockingProperty<'t> {
    tx: &'t LockingTransaction<'t>,
    owner: ElementRef,
    key: String,
}

impl<'t> LockingProperty<'t> {
    pub(crate) fn new(tx: &'t LockingTransaction<'t>, owner: ElementRef, key: impl Into<String>) -> Self {
        Self {
            tx,
            owner,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The vertex or edge owning this property
    pub fn owner(&self) -> ElementRef {
        self.owner
    }

    /// Current value, or `None` when the property is absent
    pub fn value(&self) -> Result<Option<Value>> {
        self.tx
            .read(|graph| graph.property(self.owner, &self.key).cloned())
    }

    pub fn is_present(&self) -> Result<bool> {
        Ok(self.value()?.is_some())
    }

    /// Detached copy, or `None` when the property is absent
    pub fn detach(&self) -> Result<Option<DetachedProperty>> {
        Ok(self
            .value()?
            .map(|value| DetachedProperty::new(self.owner, self.key.clone(), value)))
    }

    /// Replace the value of this property
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let old = self.tx.write(|graph| {
            if !graph.contains(self.owner) {
                return Err(StoreError::ElementNotFound(self.owner.to_string()));
            }
            Ok(graph.set_property(self.owner, &self.key, value.clone())?)
        })?;
        self.tx.register_mutation(MutationEvent::property_changed(
            self.owner,
            &self.key,
            old,
            Some(value),
        ))
    }

    /// Remove the property from its owner. Removing an absent property does nothing.
    pub fn remove(&self) -> Result<()> {
        let old = self.tx.write(|graph| {
            if !graph.contains(self.owner) {
                return Err(StoreError::ElementNotFound(self.owner.to_string()));
            }
            Ok(graph.remove_property(self.owner, &self.key)?)
        })?;
        match old {
            Some(value) => self.tx.register_mutation(MutationEvent::property_changed(
                self.owner,
                &self.key,
                Some(value),
                None,
            )),
            None => Ok(()),
        }
    }
}

impl PartialEq for LockingProperty<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.key == other.key
    }
}

impl fmt::Debug for LockingProperty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockingProperty")
            .field("owner", &self.owner)
            .field("key", &self.key)
            .finish()
    }
}

impl fmt::Display for LockingProperty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p[{}.{}]", self.owner, self.key)
    }
}
