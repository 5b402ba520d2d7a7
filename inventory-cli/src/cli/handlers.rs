// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for Inventory Store

use std::path::{Path, PathBuf};

use colored::Colorize;
use inventory_store::txn::wal::{list_segments, read_segment};
use inventory_store::{Edge, StoreConfig, TransactionLockingGraph, Vertex};

use super::commands::OutputFormat;
use super::output::{GraphFormatter, SegmentRow};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn require_store_dir(path: &Path) -> CliResult {
    if !path.is_dir() {
        return Err(format!("No store directory at {:?}", path).into());
    }
    Ok(())
}

/// Open the store at `path`; this replays any pending segments
fn open_store(path: &Path) -> Result<TransactionLockingGraph, Box<dyn std::error::Error>> {
    require_store_dir(path)?;
    let store = TransactionLockingGraph::open(StoreConfig::new(path))
        .map_err(|e| format!("Failed to open store: {}", e))?;
    let report = store.recovery_report();
    if report.segments_folded() > 0 || report.stray_files_removed > 0 {
        log::info!(
            "Recovered {} segments, removed {} incomplete files",
            report.segments_folded(),
            report.stray_files_removed
        );
    }
    Ok(store)
}

/// Handle the segments command. Reads the directory without opening the store,
/// so pending segments are listed rather than replayed.
pub fn handle_segments(path: PathBuf) -> CliResult {
    require_store_dir(&path)?;
    let rows: Vec<SegmentRow> = list_segments(&path)?
        .into_iter()
        .map(|info| match read_segment(&info.path) {
            Ok(segment) => SegmentRow {
                sequence: info.sequence,
                committed_at: Some(segment.committed_at),
                events: Some(segment.events.len()),
                bytes: info.bytes,
                problem: None,
            },
            Err(e) => SegmentRow {
                sequence: info.sequence,
                committed_at: None,
                events: None,
                bytes: info.bytes,
                problem: Some(e.to_string()),
            },
        })
        .collect();

    print!("{}", GraphFormatter::format_segments(&rows));
    Ok(())
}

/// Handle the dump command
pub fn handle_dump(path: PathBuf, format: OutputFormat) -> CliResult {
    let store = open_store(&path)?;
    let (vertices, edges) = {
        let tx = store.open_transaction()?;
        let vertices: Vec<Vertex> = tx
            .vertices()?
            .iter()
            .map(|v| v.detach())
            .collect::<Result<_, _>>()?;
        let edges: Vec<Edge> = tx
            .edges()?
            .iter()
            .map(|e| e.detach())
            .collect::<Result<_, _>>()?;
        tx.rollback()?;
        (vertices, edges)
    };
    store.close_without_flush();

    print!("{}", GraphFormatter::format_graph(&vertices, &edges, format));
    Ok(())
}

/// Handle the compact command
pub fn handle_compact(path: PathBuf) -> CliResult {
    println!("{}", "Compacting store...".bold().green());
    let store = open_store(&path)?;
    let recovered = store.recovery_report().clone();
    let report = store.close()?;

    println!(
        "  → Segments folded: {}",
        recovered.segments_folded() + report.segments_folded
    );
    println!("  → Incomplete files removed: {}", recovered.stray_files_removed);
    println!(
        "  → Snapshot holds {} vertices and {} edges (through segment {})",
        report.vertex_count, report.edge_count, report.folded_through
    );
    println!("{}", "Done".green());
    Ok(())
}

/// Handle the stats command
pub fn handle_stats(path: PathBuf, format: OutputFormat) -> CliResult {
    let store = open_store(&path)?;
    let stats = {
        let tx = store.open_transaction()?;
        let stats = tx.stats()?;
        tx.rollback()?;
        stats
    };
    let segments = store.segment_count()?;
    store.close_without_flush();

    print!("{}", GraphFormatter::format_stats(&stats, segments, format));
    Ok(())
}
