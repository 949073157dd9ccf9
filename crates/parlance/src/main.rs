// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlance - a multi-turn bot conversation backend.
//!
//! This is the binary entry point for the Parlance service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod serve;

/// Parlance - a multi-turn bot conversation backend.
#[derive(Parser, Debug)]
#[command(name = "parlance", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file, overriding the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Parlance gateway and turn engine.
    Serve,
    /// Load and validate the configuration, then exit.
    ConfigCheck,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => parlance_config::load_and_validate_path(path),
        None => parlance_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            parlance_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::ConfigCheck) => {
            println!(
                "parlance: config ok (agent.name={}, bots={})",
                config.agent.name,
                config.bots.len()
            );
        }
        Some(Commands::Serve) | None => {
            if let Err(err) = serve::run_serve(config).await {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}
