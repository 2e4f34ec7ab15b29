// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Violation reports.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};

use pubreward_core::types::{DealTag, ViolationFilter, ViolationRecord, ViolationUpdate};

use crate::filter::{QueryFilter, ViolationColumn};

const SELECT: &str = "SELECT plaintiff, defendant, message_key, reasons, deal_tag,
        record_time, deal_time, reward_note FROM violations";

pub(crate) fn deal_tag_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DealTag> {
    let raw: String = row.get(idx)?;
    DealTag::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<ViolationRecord> {
    Ok(ViolationRecord {
        plaintiff: row.get(0)?,
        defendant: row.get(1)?,
        message_key: row.get(2)?,
        reasons: row.get(3)?,
        deal_tag: deal_tag_at(row, 4)?,
        record_time: row.get(5)?,
        deal_time: row.get(6)?,
        reward_note: row.get(7)?,
    })
}

/// Inserts a pending report unless one is already open for the triple.
///
/// Returns `false` for a duplicate; the existing record is left untouched.
pub fn insert_if_absent(conn: &Connection, record: &ViolationRecord) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO violations
             (plaintiff, defendant, message_key, reasons, deal_tag, record_time)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
        params![
            record.plaintiff,
            record.defendant,
            record.message_key,
            record.reasons,
            record.record_time
        ],
    )?;
    Ok(inserted == 1)
}

/// Applies a deal to the most recent report for the triple.
///
/// A supplied reward note replaces the stored one; `None` keeps it.
pub fn update(conn: &Connection, update: &ViolationUpdate) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE violations
         SET deal_tag = ?1, deal_time = ?2, reward_note = COALESCE(?3, reward_note)
         WHERE id = (
             SELECT MAX(id) FROM violations
             WHERE plaintiff = ?4 AND defendant = ?5 AND message_key = ?6
         )",
        params![
            update.deal_tag.as_str(),
            update.deal_time,
            update.reward_note,
            update.plaintiff,
            update.defendant,
            update.message_key
        ],
    )?;
    Ok(changed == 1)
}

pub fn list(conn: &Connection, filter: &ViolationFilter) -> rusqlite::Result<Vec<ViolationRecord>> {
    let filter = QueryFilter::<ViolationColumn>::from(filter);
    let mut stmt = conn.prepare(&filter.sql(SELECT, " ORDER BY id"))?;
    let rows = stmt.query_map(params_from_iter(filter.params()), from_row)?;
    rows.collect()
}
