// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sensitive-word evidence log.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use pubreward_core::types::{DealTag, SensitiveWordRecord};

use crate::filter::{QueryFilter, SensitiveColumn};
use crate::queries::violations::deal_tag_at;

const SELECT: &str = "SELECT reporter_pub_id, time, flagged_text, message_key, author_id,
        deal_tag, deal_time FROM sensitive_word_records";

fn from_row(row: &Row<'_>) -> rusqlite::Result<SensitiveWordRecord> {
    Ok(SensitiveWordRecord {
        reporter_pub_id: row.get(0)?,
        time: row.get(1)?,
        flagged_text: row.get(2)?,
        message_key: row.get(3)?,
        author_id: row.get(4)?,
        deal_tag: deal_tag_at(row, 5)?,
        deal_time: row.get(6)?,
    })
}

/// Appends a record. A second record for the same message is ignored.
pub fn insert(conn: &Connection, record: &SensitiveWordRecord) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO sensitive_word_records
             (message_key, reporter_pub_id, time, flagged_text, author_id, deal_tag)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let inserted = stmt.execute(params![
        record.message_key,
        record.reporter_pub_id,
        record.time,
        record.flagged_text,
        record.author_id,
        record.deal_tag.as_str()
    ])?;
    Ok(inserted == 1)
}

pub fn update(
    conn: &Connection,
    message_key: &str,
    deal_tag: DealTag,
    deal_time: i64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE sensitive_word_records SET deal_tag = ?1, deal_time = ?2 WHERE message_key = ?3",
        params![deal_tag.as_str(), deal_time, message_key],
    )?;
    Ok(changed == 1)
}

pub fn get(conn: &Connection, message_key: &str) -> rusqlite::Result<Option<SensitiveWordRecord>> {
    conn.query_row(
        &format!("{SELECT} WHERE message_key = ?1"),
        params![message_key],
        from_row,
    )
    .optional()
}

pub fn list(conn: &Connection, deal_tag: Option<DealTag>) -> rusqlite::Result<Vec<SensitiveWordRecord>> {
    list_where(conn, QueryFilter::by_tag(deal_tag))
}

/// Whether `author_id` has a record still awaiting review.
pub fn has_pending(conn: &Connection, author_id: &str) -> rusqlite::Result<bool> {
    let filter = QueryFilter::by_tag(Some(DealTag::Pending)).eq(SensitiveColumn::AuthorId, author_id.to_string());
    Ok(!list_where(conn, filter)?.is_empty())
}

fn list_where(
    conn: &Connection,
    filter: QueryFilter<SensitiveColumn>,
) -> rusqlite::Result<Vec<SensitiveWordRecord>> {
    let mut stmt = conn.prepare(&filter.sql(SELECT, " ORDER BY time, message_key"))?;
    let rows = stmt.query_map(params_from_iter(filter.params()), from_row)?;
    rows.collect()
}
