// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration bonus bookkeeping.
//!
//! Amounts are stored as decimal text since they exceed SQLite's integer range.

use pubreward_core::types::TokenAmount;
use rusqlite::{params, Connection, OptionalExtension};

fn key(counterpart: &str) -> String {
    counterpart.to_ascii_lowercase()
}

/// Records that `amount` is owed to `counterpart`. An existing row, paid or
/// not, is kept so a counterpart is owed at most one bonus.
pub fn record_owed(
    conn: &Connection,
    counterpart: &str,
    amount: TokenAmount,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO registration_bonus (counterpart, amount) VALUES (?1, ?2)",
        params![key(counterpart), amount.to_string()],
    )?;
    Ok(())
}

/// The unpaid bonus for `counterpart`, if any.
pub fn owed(conn: &Connection, counterpart: &str) -> rusqlite::Result<Option<TokenAmount>> {
    let amount: Option<String> = conn
        .query_row(
            "SELECT amount FROM registration_bonus WHERE counterpart = ?1 AND paid_at IS NULL",
            params![key(counterpart)],
            |row| row.get(0),
        )
        .optional()?;
    amount
        .map(|text| {
            text.parse::<TokenAmount>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
}

/// Marks the bonus paid. Returns `true` if an unpaid row changed.
pub fn mark_paid(conn: &Connection, counterpart: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE registration_bonus SET paid_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
         WHERE counterpart = ?1 AND paid_at IS NULL",
        params![key(counterpart)],
    )?;
    Ok(changed > 0)
}
