// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic application of one batch.

use rusqlite::Connection;

use pubreward_core::types::{BatchCommit, BatchWrite};

use crate::queries::{messages, profiles, sensitive, tallies};

/// Applies every write in `batch` inside one transaction.
///
/// Either the whole batch lands or nothing does. Each statement is an
/// idempotent upsert, so replaying a committed batch adds no records, and
/// tally deltas are only present for envelopes not seen before.
pub fn commit(conn: &mut Connection, batch: &BatchWrite) -> rusqlite::Result<BatchCommit> {
    let tx = conn.transaction()?;
    let mut outcome = BatchCommit::default();

    for record in &batch.records {
        if messages::insert_if_absent(&tx, record)? {
            outcome.records_inserted += 1;
        }
    }
    for delta in &batch.tally_deltas {
        tallies::apply_delta(&tx, delta)?;
        outcome.tallies_applied += 1;
    }
    for delta in &batch.given_deltas {
        tallies::apply_given_delta(&tx, delta)?;
        outcome.given_applied += 1;
    }
    for rename in &batch.renames {
        if profiles::upsert_name(&tx, rename)? {
            outcome.renames_applied += 1;
        }
    }
    for record in &batch.sensitive {
        if sensitive::insert(&tx, record)? {
            outcome.sensitive_inserted += 1;
        }
    }

    tx.commit()?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support;
    use pubreward_core::types::{
        DealTag, GivenLikeDelta, MessageRecord, ProfileRename, SensitiveWordRecord, TallyDelta,
    };

    fn sample() -> BatchWrite {
        BatchWrite {
            records: vec![
                MessageRecord {
                    message_key: "%post".into(),
                    author_id: "@alice".into(),
                    timestamp: 1,
                },
                MessageRecord {
                    message_key: "%vote".into(),
                    author_id: "@bob".into(),
                    timestamp: 2,
                },
            ],
            tally_deltas: vec![TallyDelta {
                message_key: "%post".into(),
                author_id: "@alice".into(),
                delta: 1,
                time: 2,
            }],
            given_deltas: vec![GivenLikeDelta {
                voter_id: "@bob".into(),
                delta: 1,
                time: 2,
            }],
            renames: vec![ProfileRename {
                subject: "@bob".into(),
                name: "Bob".into(),
                time: 2,
            }],
            sensitive: vec![SensitiveWordRecord {
                reporter_pub_id: "@pub".into(),
                time: 1,
                flagged_text: "bad".into(),
                message_key: "%post".into(),
                author_id: "@alice".into(),
                deal_tag: DealTag::Pending,
                deal_time: None,
            }],
        }
    }

    #[test]
    fn commit_applies_everything() {
        let mut conn = test_support::conn();
        let outcome = commit(&mut conn, &sample()).unwrap();
        assert_eq!(
            outcome,
            BatchCommit {
                records_inserted: 2,
                tallies_applied: 1,
                given_applied: 1,
                renames_applied: 1,
                sensitive_inserted: 1,
            }
        );
        assert_eq!(tallies::get(&conn, "%post").unwrap().unwrap().like_sum, 1);
        assert_eq!(tallies::given_like_sums(&conn, Some("@bob")).unwrap()[0].like_count, 1);
    }

    #[test]
    fn failing_statement_rolls_back_the_batch() {
        let mut conn = test_support::conn();
        conn.execute_batch("DROP TABLE sensitive_word_records;").unwrap();
        assert!(commit(&mut conn, &sample()).is_err());
        assert_eq!(messages::author_of(&conn, "%post").unwrap(), None);
        assert_eq!(tallies::get(&conn, "%post").unwrap(), None);
        assert!(tallies::given_like_sums(&conn, None).unwrap().is_empty());
    }
}
