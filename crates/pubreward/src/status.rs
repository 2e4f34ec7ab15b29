// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pubreward status` command implementation.
//!
//! Reads the database directly, so it works whether or not `serve` is
//! running.

use serde::Serialize;

use pubreward_config::PubrewardConfig;
use pubreward_core::types::StoreStats;
use pubreward_core::{PluginAdapter, PubrewardError, StorageAdapter};
use pubreward_storage::SqliteStorage;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database: String,
    pub checkpoint: i64,
    pub checkpoint_utc: Option<String>,
    #[serde(flatten)]
    pub stats: StoreStats,
}

async fn collect(config: &PubrewardConfig) -> Result<StatusResponse, PubrewardError> {
    let store = SqliteStorage::open(config.storage.clone()).await?;
    let checkpoint = store.get_checkpoint().await?;
    let stats = store.stats().await?;
    store.shutdown().await?;

    Ok(StatusResponse {
        database: config.storage.database_path.clone(),
        checkpoint,
        checkpoint_utc: chrono_utc(checkpoint),
        stats,
    })
}

fn chrono_utc(ms: i64) -> Option<String> {
    (ms > 0)
        .then(|| chrono::DateTime::from_timestamp_millis(ms))
        .flatten()
        .map(|t| t.to_rfc3339())
}

fn render(status: &StatusResponse) -> String {
    let s = &status.stats;
    let mut out = String::new();
    out.push_str("\n  pubreward status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));
    out.push_str(&format!("    Database:   {}\n", status.database));
    match &status.checkpoint_utc {
        Some(at) => out.push_str(&format!("    Checkpoint: {} ({at})\n", status.checkpoint)),
        None => out.push_str("    Checkpoint: not started\n"),
    }
    out.push_str(&format!("    Messages:   {}\n", s.messages));
    out.push_str(&format!("    Tallies:    {}\n", s.tallies));
    out.push_str(&format!(
        "    Profiles:   {} ({} with address)\n",
        s.profiles, s.registered
    ));
    out.push_str(&format!("    Reports:    {} open\n", s.open_violations));
    out.push_str(&format!("    Flagged:    {} pending\n", s.pending_sensitive));
    out.push_str(&format!("    Blocked:    {}\n", s.blacklisted));
    out
}

pub async fn run_status(config: &PubrewardConfig, json: bool) -> Result<(), PubrewardError> {
    let status = collect(config).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print!("{}", render(&status));
    }
    Ok(())
}
