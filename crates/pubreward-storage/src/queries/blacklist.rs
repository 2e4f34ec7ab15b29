// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocked identities.

use rusqlite::{params, Connection};

pub fn contains(conn: &Connection, identity: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blacklist WHERE identity = ?1)",
        params![identity],
        |row| row.get(0),
    )
}

/// Adds `identity`. Re-adding keeps the original entry.
pub fn add(conn: &Connection, identity: &str, reason: &str, time: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO blacklist (identity, reason, blocked_at) VALUES (?1, ?2, ?3)",
        params![identity, reason, time],
    )?;
    Ok(())
}
