// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collected user tasks.

use std::str::FromStr;

use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};

use pubreward_core::types::{TaskKind, UserTask, UserTaskFilter};

fn from_row(row: &Row<'_>) -> rusqlite::Result<UserTask> {
    let kind: String = row.get(2)?;
    Ok(UserTask {
        pub_id: row.get(0)?,
        client_id: row.get(1)?,
        kind: TaskKind::from_str(&kind)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        time: row.get(3)?,
        nft_tx_hash: row.get(4)?,
        nft_token_id: row.get(5)?,
        nft_store_url: row.get(6)?,
    })
}

/// Appends `task`. Returns `false` when its NFT transaction was already collected.
pub fn insert(conn: &Connection, task: &UserTask) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO user_tasks
             (pub_id, client_id, kind, time, nft_tx_hash, nft_token_id, nft_store_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            task.pub_id,
            task.client_id,
            task.kind.as_str(),
            task.time,
            task.nft_tx_hash,
            task.nft_token_id,
            task.nft_store_url
        ],
    )?;
    Ok(inserted == 1)
}

/// Tasks of `filter.client_id`, oldest first.
pub fn list(conn: &Connection, filter: &UserTaskFilter) -> rusqlite::Result<Vec<UserTask>> {
    let mut sql = String::from(
        "SELECT pub_id, client_id, kind, time, nft_tx_hash, nft_token_id, nft_store_url
         FROM user_tasks WHERE client_id = ?1",
    );
    let mut values: Vec<Value> = vec![Value::Text(filter.client_id.clone())];
    if let Some(kind) = filter.kind {
        values.push(Value::Text(kind.as_str().to_string()));
        sql.push_str(&format!(" AND kind = ?{}", values.len()));
    }
    if let Some(start) = filter.start_time {
        values.push(Value::Integer(start));
        sql.push_str(&format!(" AND time >= ?{}", values.len()));
    }
    if let Some(end) = filter.end_time {
        values.push(Value::Integer(end));
        sql.push_str(&format!(" AND time <= ?{}", values.len()));
    }
    sql.push_str(" ORDER BY time, id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), from_row)?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support;

    fn login(client: &str, time: i64) -> UserTask {
        UserTask {
            pub_id: "@pub".into(),
            client_id: client.into(),
            kind: TaskKind::Login,
            time,
            nft_tx_hash: None,
            nft_token_id: None,
            nft_store_url: None,
        }
    }

    fn nft(client: &str, time: i64, tx: &str) -> UserTask {
        UserTask {
            kind: TaskKind::NftCreated,
            nft_tx_hash: Some(tx.into()),
            nft_token_id: Some("7".into()),
            nft_store_url: Some("ipfs://x".into()),
            ..login(client, time)
        }
    }

    fn filter(client: &str) -> UserTaskFilter {
        UserTaskFilter {
            client_id: client.into(),
            ..Default::default()
        }
    }

    #[test]
    fn logins_repeat_but_nft_transactions_are_unique() {
        let conn = test_support::conn();
        assert!(insert(&conn, &login("@alice", 1)).unwrap());
        assert!(insert(&conn, &login("@alice", 1)).unwrap());
        assert!(insert(&conn, &nft("@alice", 2, "0xtx")).unwrap());
        assert!(!insert(&conn, &nft("@alice", 3, "0xtx")).unwrap());
        assert_eq!(list(&conn, &filter("@alice")).unwrap().len(), 3);
    }

    #[test]
    fn list_filters_by_kind_and_inclusive_range() {
        let conn = test_support::conn();
        for t in [10, 20, 30] {
            insert(&conn, &login("@alice", t)).unwrap();
        }
        insert(&conn, &nft("@alice", 20, "0xtx")).unwrap();
        insert(&conn, &login("@bob", 20)).unwrap();

        let logins = list(
            &conn,
            &UserTaskFilter {
                kind: Some(TaskKind::Login),
                start_time: Some(20),
                end_time: Some(30),
                ..filter("@alice")
            },
        )
        .unwrap();
        assert_eq!(
            logins.iter().map(|t| t.time).collect::<Vec<_>>(),
            vec![20, 30]
        );

        let day = list(
            &conn,
            &UserTaskFilter {
                start_time: Some(20),
                end_time: Some(20),
                ..filter("@alice")
            },
        )
        .unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[1], nft("@alice", 20, "0xtx"));
    }
}
