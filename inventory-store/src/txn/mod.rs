// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management
//!
//! This module turns the non-transactional embedded graph into a store with
//! single-writer/multi-reader isolation, atomic commit and rollback, and
//! crash-safe durability.
//!
//! # Features
//! - Locking transactions (shared lock for reads, exclusive lock after the first write)
//! - Mutation log of detached before/after snapshots for rollback
//! - Write-ahead commit log, one segment per committed transaction
//! - Startup recovery replaying leftover segments over the base snapshot
//! - Background compaction folding segments into the snapshot

pub mod compaction;
pub mod log;
pub mod manager;
pub mod recovery;
pub mod state;
pub mod transaction;
pub mod wal;

pub use self::log::{DetachedEdge, DetachedProperty, DetachedVertex, MutationEvent, MutationKind};
pub use manager::{FlushReport, TransactionLockingGraph};
pub use recovery::RecoveryReport;
pub use state::TransactionState;
pub use transaction::LockingTransaction;
pub use wal::{CommitLog, Segment, SegmentInfo};
