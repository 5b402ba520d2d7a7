// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Inventory CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // -v wins over --log-level; RUST_LOG still applies to modules
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!(
                "{} {}",
                "Inventory Store".bold().green(),
                inventory_store::VERSION
            );
            println!("Transactional embedded graph store");
            Ok(())
        }
        Commands::Segments { path } => cli::handle_segments(path),
        Commands::Dump { path, format } => cli::handle_dump(path, format),
        Commands::Compact { path } => cli::handle_compact(path),
        Commands::Stats { path, format } => cli::handle_stats(path, format),
    }
}
