// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Startup recovery from the base snapshot and leftover commit segments

use std::path::Path;

use log::{debug, info};

use super::log::apply_all;
use super::wal::{list_segments, read_segment};
use crate::error::Result;
use crate::storage::{persistent, GraphCache, StorageError};

/// Summary of one recovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Incomplete `.tmp` files removed before loading
    pub stray_files_removed: usize,
    /// Segments replayed on top of the snapshot
    pub segments_replayed: usize,
    /// Mutation events applied while replaying
    pub events_replayed: usize,
    /// Segments already contained in the snapshot and removed without replay
    pub stale_segments_removed: usize,
    /// Highest segment sequence folded into the graph after recovery
    pub folded_through: u64,
}

impl RecoveryReport {
    /// Number of segments consumed by this recovery
    pub fn segments_folded(&self) -> usize {
        self.segments_replayed + self.stale_segments_removed
    }
}

/// Rebuild the live graph for `dir`.
///
/// Loads the base snapshot, replays every segment newer than its
/// `folded_through` mark in sequence order, writes a fresh snapshot when
/// anything was replayed and deletes every consumed segment. On success the
/// directory holds no segments and the returned graph is open.
pub fn recover(dir: &Path) -> Result<(GraphCache, RecoveryReport)> {
    let mut report = RecoveryReport {
        stray_files_removed: persistent::remove_stray_temp_files(dir)?,
        ..RecoveryReport::default()
    };

    let mut graph = GraphCache::open(dir)?;
    let snapshot_mark = graph.folded_through();
    let segments = list_segments(dir)?;
    debug!(
        "Recovering {}: snapshot folded through {}, {} segments on disk",
        dir.display(),
        snapshot_mark,
        segments.len()
    );

    for segment in &segments {
        if segment.sequence <= snapshot_mark {
            report.stale_segments_removed += 1;
            continue;
        }
        let content = read_segment(&segment.path)?;
        debug!(
            "Replaying segment {} ({} events)",
            segment.sequence,
            content.events.len()
        );
        apply_all(&content.events, &mut graph)?;
        graph.set_folded_through(segment.sequence);
        report.segments_replayed += 1;
        report.events_replayed += content.events.len();
    }

    if report.segments_replayed > 0 {
        graph.close()?;
        graph = GraphCache::open(dir)?;
    }

    for segment in &segments {
        std::fs::remove_file(&segment.path).map_err(|e| StorageError::io(&segment.path, e))?;
    }

    report.folded_through = graph.folded_through();
    if report.segments_folded() > 0 || report.stray_files_removed > 0 {
        info!(
            "Recovered {}: replayed {} segments ({} events), removed {} stale segments and {} stray files",
            dir.display(),
            report.segments_replayed,
            report.events_replayed,
            report.stale_segments_removed,
            report.stray_files_removed
        );
    }

    Ok((graph, report))
}
