// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for Inventory Store
//!
//! Inspects and maintains a store directory: pending commit segments,
//! graph contents, compaction and statistics.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_compact, handle_dump, handle_segments, handle_stats};
