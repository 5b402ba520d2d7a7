// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction frame
//!
//! A frame collects units of work and runs them together in one
//! transaction. When the transaction cannot start because another writer
//! holds the graph, the whole frame is retried from the beginning after a
//! short pause, up to a bounded number of times.

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::Result;
use crate::txn::{LockingTransaction, TransactionLockingGraph};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

type Payload<'g> = Box<dyn FnMut(&LockingTransaction<'_>) -> Result<()> + 'g>;

/// Work composed into a single transaction with bounded retry
pub struct TransactionFrame<'g> {
    store: &'g TransactionLockingGraph,
    payloads: Vec<Payload<'g>>,
    max_retries: usize,
    retry_delay: Duration,
}

impl<'g> TransactionFrame<'g> {
    pub fn new(store: &'g TransactionLockingGraph) -> Self {
        Self {
            store,
            payloads: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Queue work for the next [`commit`](Self::commit). Work may run more than once.
    pub fn record<F>(&mut self, work: F)
    where
        F: FnMut(&LockingTransaction<'_>) -> Result<()> + 'g,
    {
        self.payloads.push(Box::new(work));
    }

    /// Number of queued units of work
    pub fn pending(&self) -> usize {
        self.payloads.len()
    }

    /// Run all queued work in one transaction and commit it.
    ///
    /// On success the queue is emptied. On failure the queue is kept, so the
    /// caller may commit again or discard it with [`rollback`](Self::rollback).
    pub fn commit(&mut self) -> Result<()> {
        if self.payloads.is_empty() {
            return Ok(());
        }
        let mut payloads = std::mem::take(&mut self.payloads);
        let result = self.run(|tx| {
            for payload in payloads.iter_mut() {
                payload(tx)?;
            }
            Ok(())
        });
        if result.is_err() {
            self.payloads = payloads;
        }
        result
    }

    /// Discard all queued work
    pub fn rollback(&mut self) {
        debug!("Discarding {} queued units of work", self.payloads.len());
        self.payloads.clear();
    }

    /// Run `work` in a fresh transaction, committing on success and rolling
    /// back on error. Retries while the store reports the graph as locked.
    pub fn run<T, F>(&self, mut work: F) -> Result<T>
    where
        F: FnMut(&LockingTransaction<'_>) -> Result<T>,
    {
        let mut retries = 0;
        loop {
            match self.attempt(&mut work) {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.max_retries && self.store.is_transaction_retry_warranted(&e) => {
                    retries += 1;
                    warn!(
                        "Transaction attempt failed ({}), retry {} of {}",
                        e, retries, self.max_retries
                    );
                    thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn attempt<T, F>(&self, work: &mut F) -> Result<T>
    where
        F: FnMut(&LockingTransaction<'_>) -> Result<T>,
    {
        let tx = self.store.open_transaction()?;
        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback() {
                    warn!("Rollback after failed work also failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }
}

impl fmt::Debug for TransactionFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionFrame")
            .field("pending", &self.payloads.len())
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}
