// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity profiles.

use rusqlite::{params, Connection, OptionalExtension, Row};

use pubreward_core::types::{IdentityProfile, ProfileRename};

const SELECT: &str = "SELECT client_id, display_name, ledger_address, bio FROM profiles";

fn from_row(row: &Row<'_>) -> rusqlite::Result<IdentityProfile> {
    Ok(IdentityProfile {
        client_id: row.get(0)?,
        display_name: row.get(1)?,
        ledger_address: row.get(2)?,
        bio: row.get(3)?,
    })
}

/// Binds `rename.name` to `rename.subject` unless a newer binding is stored.
///
/// Touches only the name columns. Returns `true` when the name changed.
pub fn upsert_name(conn: &Connection, rename: &ProfileRename) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO profiles (client_id, display_name, name_time) VALUES (?1, ?2, ?3)
         ON CONFLICT(client_id) DO UPDATE SET
             display_name = excluded.display_name,
             name_time = excluded.name_time,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE profiles.name_time IS NULL OR profiles.name_time <= excluded.name_time",
    )?;
    let changed = stmt.execute(params![rename.subject, rename.name, rename.time])?;
    Ok(changed == 1)
}

/// Stores the address an identity registered. A supplied name replaces the
/// stored one; an absent name leaves it alone.
pub fn register_address(
    conn: &Connection,
    client_id: &str,
    display_name: Option<&str>,
    address: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO profiles (client_id, display_name, ledger_address) VALUES (?1, ?2, ?3)
         ON CONFLICT(client_id) DO UPDATE SET
             display_name = COALESCE(excluded.display_name, profiles.display_name),
             ledger_address = excluded.ledger_address,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![client_id, display_name, address],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, client_id: &str) -> rusqlite::Result<Option<IdentityProfile>> {
    conn.query_row(
        &format!("{SELECT} WHERE client_id = ?1"),
        params![client_id],
        from_row,
    )
    .optional()
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<IdentityProfile>> {
    let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY client_id"))?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}

pub fn list_registered(conn: &Connection) -> rusqlite::Result<Vec<IdentityProfile>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT} WHERE ledger_address IS NOT NULL AND ledger_address != '' ORDER BY client_id"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}
