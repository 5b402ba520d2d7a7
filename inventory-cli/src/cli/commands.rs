// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command line definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "inventory",
    version,
    about = "Inspect and maintain Inventory Store directories",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<log::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List commit segments not yet folded into the snapshot
    Segments {
        /// Store directory
        #[arg(long, value_name = "DIR")]
        path: PathBuf,
    },

    /// Print every vertex and edge
    ///
    /// Opening the store runs recovery first: pending segments are folded
    /// into the snapshot and deleted.
    Dump {
        #[arg(long, value_name = "DIR")]
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Recover the store and fold all segments into the snapshot
    Compact {
        #[arg(long, value_name = "DIR")]
        path: PathBuf,
    },

    /// Vertex, edge and label counts
    ///
    /// Like `dump`, this recovers the store and folds pending segments.
    Stats {
        #[arg(long, value_name = "DIR")]
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
