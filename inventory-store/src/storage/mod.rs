// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Embedded graph storage
//!
//! This module provides:
//! - Value type system for vertex and edge properties
//! - In-memory graph with label indices and adjacency sets
//! - Checksummed, atomically replaced files for the base snapshot and commit log

pub mod graph_cache;
pub(crate) mod persistent;
pub mod types;
pub mod value;

pub use graph_cache::{GraphCache, GraphStats, SNAPSHOT_FILE};
pub use types::{
    Direction, Edge, ElementId, ElementRef, GraphError, Properties, StorageError, Vertex,
};
pub use value::Value;
