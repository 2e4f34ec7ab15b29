// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope builders and throwaway stores.

use serde_json::json;
use tempfile::TempDir;

use pubreward_config::model::StorageConfig;
use pubreward_core::types::FeedEnvelope;
use pubreward_storage::SqliteStorage;

/// Administering identity used across tests.
pub const PUB_ID: &str = "@pub0000000000000000000000000000000000000000=.ed25519";

pub fn envelope(key: &str, author: &str, timestamp: i64, content: serde_json::Value) -> FeedEnvelope {
    FeedEnvelope {
        key: key.to_string(),
        author: author.to_string(),
        timestamp,
        content: content.to_string().into_bytes(),
    }
}

pub fn vote(key: &str, author: &str, timestamp: i64, link: &str, expression: &str) -> FeedEnvelope {
    envelope(
        key,
        author,
        timestamp,
        json!({"type": "vote", "vote": {"link": link, "value": 1, "expression": expression}}),
    )
}

pub fn like(key: &str, author: &str, timestamp: i64, link: &str) -> FeedEnvelope {
    vote(key, author, timestamp, link, "Like")
}

pub fn unlike(key: &str, author: &str, timestamp: i64, link: &str) -> FeedEnvelope {
    vote(key, author, timestamp, link, "Unlike")
}

pub fn about(key: &str, author: &str, timestamp: i64, subject: &str, name: &str) -> FeedEnvelope {
    envelope(
        key,
        author,
        timestamp,
        json!({"type": "about", "about": subject, "name": name}),
    )
}

pub fn contact(
    key: &str,
    author: &str,
    timestamp: i64,
    target: &str,
    following: bool,
    blocking: bool,
) -> FeedEnvelope {
    envelope(
        key,
        author,
        timestamp,
        json!({"type": "contact", "contact": target, "following": following, "blocking": blocking}),
    )
}

pub fn post(key: &str, author: &str, timestamp: i64, text: &str) -> FeedEnvelope {
    envelope(key, author, timestamp, json!({"type": "post", "text": text}))
}

/// Opens an initialized SQLite store in a fresh temp directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn temp_storage() -> (TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("pubreward-test.db");
    let config = StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let storage = SqliteStorage::open(config).await.expect("open temp storage");
    (dir, storage)
}
