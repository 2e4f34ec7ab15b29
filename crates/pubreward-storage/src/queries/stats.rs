// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use rusqlite::Connection;

use pubreward_core::types::StoreStats;

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
}

pub fn collect(conn: &Connection) -> rusqlite::Result<StoreStats> {
    Ok(StoreStats {
        messages: count(conn, "SELECT COUNT(*) FROM message_records")?,
        tallies: count(conn, "SELECT COUNT(*) FROM like_tallies")?,
        profiles: count(conn, "SELECT COUNT(*) FROM profiles")?,
        registered: count(
            conn,
            "SELECT COUNT(*) FROM profiles WHERE ledger_address IS NOT NULL AND ledger_address != ''",
        )?,
        open_violations: count(conn, "SELECT COUNT(*) FROM violations WHERE deal_tag = 'pending'")?,
        pending_sensitive: count(
            conn,
            "SELECT COUNT(*) FROM sensitive_word_records WHERE deal_tag = 'pending'",
        )?,
        blacklisted: count(conn, "SELECT COUNT(*) FROM blacklist")?,
    })
}
