// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monotonic checkpoint.

use rusqlite::{params, Connection};

/// Result of an advance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Advanced,
    /// The stored value is higher than the attempted one; nothing changed.
    Regressed { stored: i64 },
}

pub fn get(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT last_processed FROM checkpoint WHERE id = 1",
        [],
        |row| row.get(0),
    )
}

/// Sets the checkpoint to `timestamp` unless that would move it backwards.
pub fn advance(conn: &Connection, timestamp: i64) -> rusqlite::Result<Advance> {
    let changed = conn.execute(
        "UPDATE checkpoint
         SET last_processed = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = 1 AND last_processed <= ?1",
        params![timestamp],
    )?;
    if changed == 1 {
        Ok(Advance::Advanced)
    } else {
        Ok(Advance::Regressed { stored: get(conn)? })
    }
}
