// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moderation: wordlist flagging, the blacklist gate, and human deals.
//!
//! Per identity the lifecycle is `clear -> flagged -> {upheld -> blocked,
//! dismissed -> clear}`. The state is derived from stored records by
//! [`Moderator::identity_state`]; nothing is held in memory.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use pubreward_core::types::{
    ContactAction, DealTag, FeedEnvelope, ModerationState, SensitiveWordRecord, ViolationFilter,
    ViolationRecord, ViolationUpdate,
};
use pubreward_core::{PubrewardError, Publisher, StorageAdapter};
use pubreward_ledger::ChannelReconciler;

use crate::wordmatch::WordMatcher;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Moderator {
    pub_id: String,
    matcher: WordMatcher,
    store: Arc<dyn StorageAdapter>,
    publisher: Arc<dyn Publisher>,
    reconciler: Option<Arc<ChannelReconciler>>,
    report_reward_finney: u64,
    /// Held for the whole of a deal, from the pending check to the update.
    deals: Mutex<()>,
}

impl Moderator {
    /// `pub_id` is the feed identity the pub publishes as. Moderation never
    /// targets it.
    pub fn new(
        pub_id: impl Into<String>,
        matcher: WordMatcher,
        store: Arc<dyn StorageAdapter>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            pub_id: pub_id.into(),
            matcher,
            store,
            publisher,
            reconciler: None,
            report_reward_finney: 0,
            deals: Mutex::new(()),
        }
    }

    /// Pays `reward_finney` to plaintiffs of upheld reports through `reconciler`.
    pub fn with_rewards(mut self, reconciler: Arc<ChannelReconciler>, reward_finney: u64) -> Self {
        self.reconciler = Some(reconciler);
        self.report_reward_finney = reward_finney;
        self
    }

    pub fn pub_id(&self) -> &str {
        &self.pub_id
    }

    fn is_pub(&self, identity: &str) -> bool {
        self.pub_id == identity
    }

    fn guard_not_pub(&self, identity: &str, action: &str) -> Result<(), PubrewardError> {
        if self.is_pub(identity) {
            return Err(PubrewardError::PermissionDenied(format!(
                "cannot {action} the administering identity"
            )));
        }
        Ok(())
    }

    // --- Feed evaluation ---

    /// Flags a post whose text matches the wordlist.
    pub fn evaluate_post(&self, envelope: &FeedEnvelope, text: &str) -> Option<SensitiveWordRecord> {
        if self.is_pub(&envelope.author) {
            return None;
        }
        let term = self.matcher.find(text)?;
        info!(key = %envelope.key, author = %envelope.author, term, "post flagged");
        Some(SensitiveWordRecord {
            reporter_pub_id: self.pub_id.clone(),
            time: envelope.timestamp,
            flagged_text: text.to_string(),
            message_key: envelope.key.clone(),
            author_id: envelope.author.clone(),
            deal_tag: DealTag::Pending,
            deal_time: None,
        })
    }

    /// Counter-action for a contact edge the pub published.
    ///
    /// Following a blacklisted identity is reverted by blocking it again.
    pub async fn evaluate_contact(
        &self,
        envelope: &FeedEnvelope,
        target: &str,
        following: bool,
        blocking: bool,
    ) -> Result<Option<ContactAction>, PubrewardError> {
        if !self.is_pub(&envelope.author) || !following || blocking {
            return Ok(None);
        }
        if !self.store.select_blacklist(target).await? {
            return Ok(None);
        }
        info!(target, key = %envelope.key, "pub re-followed a blacklisted identity");
        Ok(Some(ContactAction::block(target)))
    }

    pub async fn execute(&self, action: &ContactAction) -> Result<(), PubrewardError> {
        self.contact_someone(&action.target, action.unfollow, action.block)
            .await
    }

    // --- Contact ---

    /// Publishes a contact message about `target` as the pub.
    pub async fn contact_someone(
        &self,
        target: &str,
        unfollow: bool,
        block: bool,
    ) -> Result<(), PubrewardError> {
        self.guard_not_pub(target, "contact")?;
        self.publisher
            .publish_contact(target, !unfollow, block)
            .await?;
        info!(target, unfollow, block, "contact published");
        Ok(())
    }

    async fn block_identity(&self, target: &str, reason: &str) -> Result<(), PubrewardError> {
        self.contact_someone(target, true, true).await?;
        self.store.add_to_blacklist(target, reason, now_ms()).await
    }

    // --- Reports and deals ---

    /// Files a pending report of `defendant` by `plaintiff`.
    pub async fn report_violation(
        &self,
        plaintiff: &str,
        defendant: &str,
        message_key: &str,
        reasons: &str,
    ) -> Result<ViolationRecord, PubrewardError> {
        self.guard_not_pub(defendant, "report")?;
        let record = ViolationRecord {
            plaintiff: plaintiff.to_string(),
            defendant: defendant.to_string(),
            message_key: message_key.to_string(),
            reasons: reasons.to_string(),
            deal_tag: DealTag::Pending,
            record_time: now_ms(),
            deal_time: None,
            reward_note: None,
        };
        if !self.store.insert_violation_if_absent(&record).await? {
            return Err(PubrewardError::Duplicate(format!(
                "{plaintiff} already reported {defendant} for {message_key}"
            )));
        }
        info!(plaintiff, defendant, message_key, "violation reported");
        Ok(record)
    }

    /// Resolves the open report for the triple.
    ///
    /// Upholding blocks the defendant and rewards the plaintiff. If the
    /// reward transfer fails the report stays open and the deal can be
    /// retried; blocking again is harmless. Deals run one at a time, so a
    /// report is paid at most once.
    pub async fn deal_violation(
        &self,
        plaintiff: &str,
        defendant: &str,
        message_key: &str,
        tag: DealTag,
    ) -> Result<(), PubrewardError> {
        if tag == DealTag::Pending {
            return Err(PubrewardError::InvalidInput(
                "a deal must uphold or dismiss".into(),
            ));
        }
        let _deal = self.deals.lock().await;
        let open = self
            .store
            .list_violations(&ViolationFilter {
                plaintiff: Some(plaintiff.to_string()),
                defendant: Some(defendant.to_string()),
                message_key: Some(message_key.to_string()),
                deal_tag: Some(DealTag::Pending),
                ..Default::default()
            })
            .await?;
        let Some(report) = open.into_iter().last() else {
            return Err(PubrewardError::NotFound(format!(
                "no open report by {plaintiff} against {defendant} for {message_key}"
            )));
        };

        let mut reward_note = None;
        if tag == DealTag::Upheld {
            self.block_identity(defendant, &report.reasons).await?;
            reward_note = self.reward_plaintiff(plaintiff).await?;
        }

        self.store
            .update_violation(&ViolationUpdate {
                plaintiff: plaintiff.to_string(),
                defendant: defendant.to_string(),
                message_key: message_key.to_string(),
                deal_tag: tag,
                deal_time: now_ms(),
                reward_note,
            })
            .await?;
        info!(plaintiff, defendant, message_key, tag = %tag, "violation dealt");
        Ok(())
    }

    async fn reward_plaintiff(&self, plaintiff: &str) -> Result<Option<String>, PubrewardError> {
        let Some(reconciler) = &self.reconciler else {
            return Ok(None);
        };
        if self.report_reward_finney == 0 {
            return Ok(None);
        }
        let address = self
            .store
            .get_profile(plaintiff)
            .await?
            .and_then(|p| p.ledger_address);
        let Some(address) = address else {
            warn!(plaintiff, "plaintiff has no registered address, reward skipped");
            return Ok(None);
        };
        let amount = u128::from(self.report_reward_finney) * pubreward_core::types::FINNEY;
        reconciler.reward(&address, amount).await?;
        Ok(Some(format!("{}e15-", self.report_reward_finney)))
    }

    /// Resolves the pending sensitive-word record for `message_key`.
    ///
    /// A record that was already dealt is refused with `InvalidInput`.
    pub async fn deal_sensitive_word(
        &self,
        message_key: &str,
        tag: DealTag,
    ) -> Result<(), PubrewardError> {
        if tag == DealTag::Pending {
            return Err(PubrewardError::InvalidInput(
                "a deal must uphold or dismiss".into(),
            ));
        }
        let _deal = self.deals.lock().await;
        let record = self
            .store
            .get_sensitive_word_record(message_key)
            .await?
            .ok_or_else(|| PubrewardError::NotFound(format!("no flagged post {message_key}")))?;
        if record.deal_tag != DealTag::Pending {
            return Err(PubrewardError::InvalidInput(format!(
                "flagged post {message_key} was already dealt ({})",
                record.deal_tag
            )));
        }

        if tag == DealTag::Upheld {
            self.block_identity(&record.author_id, &record.flagged_text)
                .await?;
        }
        self.store
            .update_sensitive_word_record(message_key, tag, now_ms())
            .await?;
        info!(message_key, author = %record.author_id, tag = %tag, "flagged post dealt");
        Ok(())
    }

    pub async fn identity_state(&self, identity: &str) -> Result<ModerationState, PubrewardError> {
        if self.store.select_blacklist(identity).await? {
            return Ok(ModerationState::Blocked);
        }
        if self.store.has_pending_sensitive(identity).await? {
            return Ok(ModerationState::Flagged);
        }
        Ok(ModerationState::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubreward_config::model::LedgerConfig;
    use pubreward_core::types::FINNEY;
    use pubreward_test_utils::fixtures::{self, PUB_ID, temp_storage};
    use pubreward_test_utils::{LedgerCall, PublishedContact, RecordingPublisher, ScriptedLedger};

    const TOKEN: &str = "0x6601F810eaF2fa749EEa10533Fd4CC23B8C791dc";
    const ALICE_ADDR: &str = "0x00000000000000000000000000000000000000a1";

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<dyn StorageAdapter>,
        publisher: Arc<RecordingPublisher>,
        ledger: Arc<ScriptedLedger>,
        moderator: Moderator,
    }

    async fn harness(words: &[&str]) -> Harness {
        let (dir, store) = temp_storage().await;
        let store: Arc<dyn StorageAdapter> = Arc::new(store);
        let publisher = Arc::new(RecordingPublisher::new());
        let ledger = Arc::new(ScriptedLedger::new("0xself", TOKEN));
        let reconciler = Arc::new(ChannelReconciler::new(
            ledger.clone(),
            store.clone(),
            LedgerConfig {
                enabled: true,
                token_address: TOKEN.into(),
                ..Default::default()
            },
        ));
        let moderator = Moderator::new(
            PUB_ID,
            WordMatcher::new(words.iter().copied(), true).unwrap(),
            store.clone(),
            publisher.clone(),
        )
        .with_rewards(reconciler, 5);
        Harness {
            _dir: dir,
            store,
            publisher,
            ledger,
            moderator,
        }
    }

    fn blocked(target: &str) -> PublishedContact {
        PublishedContact {
            target: target.to_string(),
            following: false,
            blocking: true,
        }
    }

    #[tokio::test]
    async fn matching_post_is_flagged_pending() {
        let h = harness(&["scam"]).await;
        let env = fixtures::post("%p1", "@mallory", 7, "a total SCAM");
        let record = h.moderator.evaluate_post(&env, "a total SCAM").unwrap();
        assert_eq!(record.deal_tag, DealTag::Pending);
        assert_eq!(record.reporter_pub_id, PUB_ID);
        assert_eq!(record.author_id, "@mallory");

        let clean = fixtures::post("%p2", "@mallory", 8, "hello");
        assert!(h.moderator.evaluate_post(&clean, "hello").is_none());
    }

    #[tokio::test]
    async fn self_targeted_contact_is_refused() {
        let h = harness(&[]).await;
        let err = h
            .moderator
            .contact_someone(PUB_ID, true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::PermissionDenied(_)));
        assert!(h.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn pub_refollowing_blacklisted_identity_triggers_block() {
        let h = harness(&[]).await;
        h.store.add_to_blacklist("@mallory", "spam", 1).await.unwrap();

        let refollow = fixtures::contact("%c1", PUB_ID, 5, "@mallory", true, false);
        let action = h
            .moderator
            .evaluate_contact(&refollow, "@mallory", true, false)
            .await
            .unwrap();
        assert_eq!(action, Some(ContactAction::block("@mallory")));

        let by_other = fixtures::contact("%c2", "@bob", 6, "@mallory", true, false);
        let none = h
            .moderator
            .evaluate_contact(&by_other, "@mallory", true, false)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn report_against_pub_and_duplicates_are_rejected() {
        let h = harness(&[]).await;
        let err = h
            .moderator
            .report_violation("@alice", PUB_ID, "%m1", "spam")
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::PermissionDenied(_)));

        h.moderator
            .report_violation("@alice", "@mallory", "%m1", "spam")
            .await
            .unwrap();
        let dup = h
            .moderator
            .report_violation("@alice", "@mallory", "%m1", "spam again")
            .await
            .unwrap_err();
        assert!(matches!(dup, PubrewardError::Duplicate(_)));
    }

    #[tokio::test]
    async fn upheld_report_blocks_defendant_and_rewards_plaintiff() {
        let h = harness(&[]).await;
        h.store
            .register_ledger_address("@alice", None, ALICE_ADDR)
            .await
            .unwrap();
        h.moderator
            .report_violation("@alice", "@mallory", "%m1", "spam")
            .await
            .unwrap();

        h.moderator
            .deal_violation("@alice", "@mallory", "%m1", DealTag::Upheld)
            .await
            .unwrap();

        assert_eq!(h.publisher.published().await, vec![blocked("@mallory")]);
        assert_eq!(
            h.moderator.identity_state("@mallory").await.unwrap(),
            ModerationState::Blocked
        );
        assert_eq!(
            h.ledger.writes().await,
            vec![LedgerCall::Transfer {
                target: ALICE_ADDR.to_string(),
                amount: 5 * FINNEY,
                direct: true,
            }]
        );

        let dealt = h
            .store
            .list_violations(&ViolationFilter::default())
            .await
            .unwrap();
        assert_eq!(dealt[0].deal_tag, DealTag::Upheld);
        assert_eq!(dealt[0].reward_note.as_deref(), Some("5e15-"));
    }

    #[tokio::test]
    async fn failed_reward_leaves_report_open() {
        let h = harness(&[]).await;
        h.store
            .register_ledger_address("@alice", None, ALICE_ADDR)
            .await
            .unwrap();
        h.ledger.fail_transfers().await;
        h.moderator
            .report_violation("@alice", "@mallory", "%m1", "spam")
            .await
            .unwrap();

        let err = h
            .moderator
            .deal_violation("@alice", "@mallory", "%m1", DealTag::Upheld)
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::Ledger { .. }));

        let open = h
            .store
            .list_violations(&ViolationFilter {
                deal_tag: Some(DealTag::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_upheld_deals_pay_once() {
        let h = harness(&[]).await;
        h.store
            .register_ledger_address("@alice", None, ALICE_ADDR)
            .await
            .unwrap();
        h.moderator
            .report_violation("@alice", "@mallory", "%m1", "spam")
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            h.moderator
                .deal_violation("@alice", "@mallory", "%m1", DealTag::Upheld),
            h.moderator
                .deal_violation("@alice", "@mallory", "%m1", DealTag::Upheld),
        );

        let mut results = [first, second];
        results.sort_by_key(|r| r.is_err());
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PubrewardError::NotFound(_))));
        let transfers = h
            .ledger
            .writes()
            .await
            .into_iter()
            .filter(|c| matches!(c, LedgerCall::Transfer { .. }))
            .count();
        assert_eq!(transfers, 1);
    }

    #[tokio::test]
    async fn dealing_missing_report_is_not_found() {
        let h = harness(&[]).await;
        let err = h
            .moderator
            .deal_violation("@alice", "@mallory", "%nope", DealTag::Dismissed)
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::NotFound(_)));

        let err = h
            .moderator
            .deal_violation("@alice", "@mallory", "%nope", DealTag::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn sensitive_word_lifecycle() {
        let h = harness(&["scam"]).await;
        for (key, author) in [("%p1", "@mallory"), ("%p2", "@bob")] {
            let env = fixtures::post(key, author, 1, "scam");
            let record = h.moderator.evaluate_post(&env, "scam").unwrap();
            h.store.insert_sensitive_word_record(&record).await.unwrap();
        }
        assert_eq!(
            h.moderator.identity_state("@mallory").await.unwrap(),
            ModerationState::Flagged
        );

        h.moderator
            .deal_sensitive_word("%p1", DealTag::Upheld)
            .await
            .unwrap();
        h.moderator
            .deal_sensitive_word("%p2", DealTag::Dismissed)
            .await
            .unwrap();

        assert_eq!(
            h.moderator.identity_state("@mallory").await.unwrap(),
            ModerationState::Blocked
        );
        assert_eq!(
            h.moderator.identity_state("@bob").await.unwrap(),
            ModerationState::Clear
        );
        assert_eq!(h.publisher.published().await, vec![blocked("@mallory")]);
    }

    #[tokio::test]
    async fn dealt_flagged_post_cannot_be_dealt_again() {
        let h = harness(&["scam"]).await;
        let env = fixtures::post("%p1", "@mallory", 1, "scam");
        let record = h.moderator.evaluate_post(&env, "scam").unwrap();
        h.store.insert_sensitive_word_record(&record).await.unwrap();
        h.moderator
            .deal_sensitive_word("%p1", DealTag::Upheld)
            .await
            .unwrap();

        let err = h
            .moderator
            .deal_sensitive_word("%p1", DealTag::Dismissed)
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::InvalidInput(_)));
        let stored = h
            .store
            .get_sensitive_word_record("%p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.deal_tag, DealTag::Upheld);
        assert_eq!(
            h.moderator.identity_state("@mallory").await.unwrap(),
            ModerationState::Blocked
        );
    }
}
