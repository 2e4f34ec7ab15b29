// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite storage adapter through the trait surface.

use pubreward_config::model::StorageConfig;
use pubreward_core::types::{
    BatchWrite, DealTag, MessageRecord, ProfileRename, SensitiveWordRecord, TallyDelta,
    ViolationFilter, ViolationRecord, ViolationUpdate,
};
use pubreward_core::StorageAdapter;
use pubreward_storage::SqliteStorage;
use tempfile::TempDir;

async fn open_store() -> (TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        database_path: dir.path().join("pub.db").to_str().unwrap().to_string(),
        wal_mode: true,
    };
    let storage = SqliteStorage::open(config).await.unwrap();
    (dir, storage)
}

fn record(key: &str, author: &str, ts: i64) -> MessageRecord {
    MessageRecord {
        message_key: key.into(),
        author_id: author.into(),
        timestamp: ts,
    }
}

fn violation(plaintiff: &str, defendant: &str, key: &str) -> ViolationRecord {
    ViolationRecord {
        plaintiff: plaintiff.into(),
        defendant: defendant.into(),
        message_key: key.into(),
        reasons: "spam".into(),
        deal_tag: DealTag::Pending,
        record_time: 10,
        deal_time: None,
        reward_note: None,
    }
}

// ---- Batches ----

#[tokio::test]
async fn redelivered_batch_does_not_double_count() {
    let (_dir, store) = open_store().await;
    let batch = BatchWrite {
        records: vec![record("%m1", "@alice", 1), record("%v1", "@bob", 2)],
        tally_deltas: vec![TallyDelta {
            message_key: "%m1".into(),
            author_id: "@alice".into(),
            delta: 1,
            time: 2,
        }],
        given_deltas: vec![],
        renames: vec![],
        sensitive: vec![],
    };

    let first = store.commit_batch(&batch).await.unwrap();
    assert_eq!(first.records_inserted, 2);

    let unseen = store
        .unseen_message_keys(&["%m1".into(), "%v1".into(), "%new".into()])
        .await
        .unwrap();
    assert_eq!(unseen, vec!["%new".to_string()]);

    let tally = store.get_tally("%m1").await.unwrap().unwrap();
    assert_eq!(tally.like_sum, 1);
    assert_eq!(store.message_author("%m1").await.unwrap().as_deref(), Some("@alice"));
}

#[tokio::test]
async fn like_sums_join_profiles_and_registered_addresses() {
    let (_dir, store) = open_store().await;
    store
        .upsert_profile(&ProfileRename {
            subject: "@alice".into(),
            name: "Alice".into(),
            time: 5,
        })
        .await
        .unwrap();
    store
        .register_ledger_address("@alice", None, "0x0D0EFCcda4f079C0dD1B728297A43eE54d7170Cd")
        .await
        .unwrap();
    for (key, delta) in [("%a", 1), ("%b", 1), ("%a", -1), ("%c", 1)] {
        store
            .apply_tally_delta(&TallyDelta {
                message_key: key.into(),
                author_id: "@alice".into(),
                delta,
                time: 7,
            })
            .await
            .unwrap();
    }

    let sums = store.like_sums(Some("@alice")).await.unwrap();
    assert_eq!(sums.len(), 1);
    assert_eq!(sums[0].like_count, 2);
    assert_eq!(sums[0].display_name.as_deref(), Some("Alice"));

    let registered = store.list_registered_profiles().await.unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].display_name.as_deref(), Some("Alice"));
}

// ---- Violations ----

#[tokio::test]
async fn open_violation_is_unique_per_triple_until_dealt() {
    let (_dir, store) = open_store().await;
    let v = violation("@carol", "@mallory", "%bad");

    assert!(store.insert_violation_if_absent(&v).await.unwrap());
    assert!(!store.insert_violation_if_absent(&v).await.unwrap());

    let dealt = store
        .update_violation(&ViolationUpdate {
            plaintiff: v.plaintiff.clone(),
            defendant: v.defendant.clone(),
            message_key: v.message_key.clone(),
            deal_tag: DealTag::Dismissed,
            deal_time: 20,
            reward_note: None,
        })
        .await
        .unwrap();
    assert!(dealt);

    // Once dealt, the same triple may be reported again.
    assert!(store.insert_violation_if_absent(&v).await.unwrap());

    let pending = store
        .list_violations(&ViolationFilter {
            deal_tag: Some(DealTag::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let all = store.list_violations(&ViolationFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].deal_tag, DealTag::Dismissed);
}

// ---- Sensitive words and blacklist ----

#[tokio::test]
async fn sensitive_word_lifecycle() {
    let (_dir, store) = open_store().await;
    let rec = SensitiveWordRecord {
        reporter_pub_id: "@pub".into(),
        time: 30,
        flagged_text: "buy cheap pills".into(),
        message_key: "%post".into(),
        author_id: "@spammer".into(),
        deal_tag: DealTag::Pending,
        deal_time: None,
    };

    assert!(store.insert_sensitive_word_record(&rec).await.unwrap());
    assert!(!store.insert_sensitive_word_record(&rec).await.unwrap());
    assert!(store.has_pending_sensitive("@spammer").await.unwrap());

    assert!(store
        .update_sensitive_word_record("%post", DealTag::Upheld, 40)
        .await
        .unwrap());
    assert!(!store.has_pending_sensitive("@spammer").await.unwrap());

    let upheld = store
        .list_sensitive_word_records(Some(DealTag::Upheld))
        .await
        .unwrap();
    assert_eq!(upheld.len(), 1);
    assert_eq!(upheld[0].deal_time, Some(40));
}

#[tokio::test]
async fn blacklist_and_stats() {
    let (_dir, store) = open_store().await;
    assert!(!store.select_blacklist("@eve").await.unwrap());
    store.add_to_blacklist("@eve", "upheld report", 50).await.unwrap();
    store.add_to_blacklist("@eve", "again", 51).await.unwrap();
    assert!(store.select_blacklist("@eve").await.unwrap());

    store.upsert_message_record(&record("%x", "@eve", 1)).await.unwrap();
    store.advance_checkpoint(1).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.blacklisted, 1);
    assert_eq!(stats.messages, 1);
    assert_eq!(store.get_checkpoint().await.unwrap(), 1);
}
