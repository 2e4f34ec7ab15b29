// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-once message index.

use rusqlite::{params, Connection, OptionalExtension};

use pubreward_core::types::MessageRecord;

/// Inserts the record if its key is new. Returns `true` when a row was added.
pub fn insert_if_absent(conn: &Connection, record: &MessageRecord) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO message_records (message_key, author_id, timestamp)
         VALUES (?1, ?2, ?3)",
    )?;
    let inserted = stmt.execute(params![
        record.message_key,
        record.author_id,
        record.timestamp
    ])?;
    Ok(inserted == 1)
}

pub fn author_of(conn: &Connection, message_key: &str) -> rusqlite::Result<Option<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT author_id FROM message_records WHERE message_key = ?1")?;
    stmt.query_row(params![message_key], |row| row.get(0))
        .optional()
}

/// Keys from `keys` with no stored record, in input order.
pub fn unseen(conn: &Connection, keys: &[String]) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM message_records WHERE message_key = ?1)")?;
    let mut out = Vec::new();
    for key in keys {
        let seen: bool = stmt.query_row(params![key], |row| row.get(0))?;
        if !seen {
            out.push(key.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support;

    fn record(key: &str, author: &str) -> MessageRecord {
        MessageRecord {
            message_key: key.to_string(),
            author_id: author.to_string(),
            timestamp: 1,
        }
    }

    #[test]
    fn second_insert_is_ignored() {
        let conn = test_support::conn();
        assert!(insert_if_absent(&conn, &record("%m1", "@alice")).unwrap());
        assert!(!insert_if_absent(&conn, &record("%m1", "@mallory")).unwrap());
        assert_eq!(author_of(&conn, "%m1").unwrap().as_deref(), Some("@alice"));
    }

    #[test]
    fn unknown_author_is_none() {
        let conn = test_support::conn();
        assert_eq!(author_of(&conn, "%missing").unwrap(), None);
    }

    #[test]
    fn unseen_filters_known_keys() {
        let conn = test_support::conn();
        insert_if_absent(&conn, &record("%m2", "@alice")).unwrap();
        let keys = vec!["%m1".to_string(), "%m2".to_string(), "%m3".to_string()];
        assert_eq!(unseen(&conn, &keys).unwrap(), vec!["%m1", "%m3"]);
    }
}
