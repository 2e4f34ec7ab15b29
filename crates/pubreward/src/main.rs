// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! pubreward - pub-side feed engine.
//!
//! Tails the feed, keeps like tallies and moderation records, and pays
//! rewards over payment channels.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pubreward_config::PubrewardConfig;

/// pubreward - pub-side feed engine.
#[derive(Parser, Debug)]
#[command(name = "pubreward", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Replaces the default search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the driver loop and the admin API until interrupted.
    Serve,
    /// Run one channel reconciliation sweep and exit.
    Sweep,
    /// Print the checkpoint and table counts.
    Status {
        /// Emit JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load(path: Option<&PathBuf>) -> PubrewardConfig {
    let loaded = match path {
        Some(p) => pubreward_config::load_and_validate_path(p),
        None => pubreward_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            pubreward_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_ref());

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sweep => serve::run_sweep(config).await,
        Commands::Status { json } => status::run_status(&config, json).await,
        Commands::CheckConfig => {
            println!("pubreward: configuration is valid");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("pubreward: {e}");
        std::process::exit(1);
    }
}
