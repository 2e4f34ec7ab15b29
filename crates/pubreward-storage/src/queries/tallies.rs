// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Additive like/unlike tallies.

use rusqlite::{params, Connection, OptionalExtension, Row};

use pubreward_core::types::{GivenLikeDelta, LikeSum, LikeTally, TallyDelta};

/// Adds `delta.delta` to the message's tally, creating it at zero first.
///
/// The sum is never clamped: an unlike without a matching like yields -1.
pub fn apply_delta(conn: &Connection, delta: &TallyDelta) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO like_tallies (message_key, author_id, like_sum, last_update_time)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(message_key) DO UPDATE SET
             like_sum = like_sum + excluded.like_sum,
             last_update_time = MAX(last_update_time, excluded.last_update_time)",
    )?;
    stmt.execute(params![
        delta.message_key,
        delta.author_id,
        delta.delta,
        delta.time
    ])?;
    Ok(())
}

pub fn get(conn: &Connection, message_key: &str) -> rusqlite::Result<Option<LikeTally>> {
    conn.query_row(
        "SELECT message_key, author_id, like_sum, last_update_time
         FROM like_tallies WHERE message_key = ?1",
        params![message_key],
        |row| {
            Ok(LikeTally {
                message_key: row.get(0)?,
                author_id: row.get(1)?,
                like_sum: row.get(2)?,
                last_update_time: row.get(3)?,
            })
        },
    )
    .optional()
}

fn like_sum_from_row(row: &Row<'_>) -> rusqlite::Result<LikeSum> {
    Ok(LikeSum {
        client_id: row.get(0)?,
        display_name: row.get(1)?,
        ledger_address: row.get(2)?,
        like_count: row.get(3)?,
    })
}

/// Net likes per author, highest first.
pub fn like_sums(conn: &Connection, client_id: Option<&str>) -> rusqlite::Result<Vec<LikeSum>> {
    const SELECT: &str = "SELECT t.author_id, p.display_name, p.ledger_address, SUM(t.like_sum)
         FROM like_tallies t LEFT JOIN profiles p ON p.client_id = t.author_id";
    const GROUP: &str = " GROUP BY t.author_id ORDER BY SUM(t.like_sum) DESC, t.author_id";

    match client_id {
        Some(id) => {
            let mut stmt = conn.prepare(&format!("{SELECT} WHERE t.author_id = ?1{GROUP}"))?;
            let rows = stmt.query_map(params![id], like_sum_from_row)?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(&format!("{SELECT}{GROUP}"))?;
            let rows = stmt.query_map([], like_sum_from_row)?;
            rows.collect()
        }
    }
}

/// Adds `delta.delta` to the likes `delta.voter_id` has given.
pub fn apply_given_delta(conn: &Connection, delta: &GivenLikeDelta) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO given_like_tallies (client_id, like_sum, last_update_time)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(client_id) DO UPDATE SET
             like_sum = like_sum + excluded.like_sum,
             last_update_time = MAX(last_update_time, excluded.last_update_time)",
    )?;
    stmt.execute(params![delta.voter_id, delta.delta, delta.time])?;
    Ok(())
}

/// Net likes given per voter, highest first.
pub fn given_like_sums(
    conn: &Connection,
    client_id: Option<&str>,
) -> rusqlite::Result<Vec<LikeSum>> {
    const SELECT: &str = "SELECT g.client_id, p.display_name, p.ledger_address, g.like_sum
         FROM given_like_tallies g LEFT JOIN profiles p ON p.client_id = g.client_id";
    const ORDER: &str = " ORDER BY g.like_sum DESC, g.client_id";

    match client_id {
        Some(id) => {
            let mut stmt = conn.prepare(&format!("{SELECT} WHERE g.client_id = ?1{ORDER}"))?;
            let rows = stmt.query_map(params![id], like_sum_from_row)?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(&format!("{SELECT}{ORDER}"))?;
            let rows = stmt.query_map([], like_sum_from_row)?;
            rows.collect()
        }
    }
}
