// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that injects write failures.
//!
//! Delegates every call to an inner adapter. Batch commits and checkpoint
//! advances can be armed to fail a set number of times.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use pubreward_core::types::{
    AdapterType, BatchCommit, BatchWrite, DealTag, HealthStatus, IdentityProfile, LikeSum,
    LikeTally, MessageRecord, ProfileRename, SensitiveWordRecord, StoreStats, TallyDelta,
    TokenAmount, UserTask, UserTaskFilter, ViolationFilter, ViolationRecord, ViolationUpdate,
};
use pubreward_core::{PluginAdapter, PubrewardError, StorageAdapter};

pub struct FailingStore {
    inner: Arc<dyn StorageAdapter>,
    commit_failures: AtomicUsize,
    advance_failures: AtomicUsize,
    regress_advances: AtomicUsize,
}

/// Decrements `counter` if positive. Returns `true` if it was.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl FailingStore {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            commit_failures: AtomicUsize::new(0),
            advance_failures: AtomicUsize::new(0),
            regress_advances: AtomicUsize::new(0),
        }
    }

    /// The next `n` batch commits fail without writing.
    pub fn fail_commits(&self, n: usize) {
        self.commit_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` checkpoint advances fail without writing.
    pub fn fail_advances(&self, n: usize) {
        self.advance_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` checkpoint advances report a regression.
    pub fn regress_advances(&self, n: usize) {
        self.regress_advances.store(n, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> PubrewardError {
    PubrewardError::persistence(format!("injected {what} failure"))
}

#[async_trait]
impl PluginAdapter for FailingStore {
    fn name(&self) -> &str {
        "failing-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FailingStore {
    async fn initialize(&self) -> Result<(), PubrewardError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), PubrewardError> {
        self.inner.close().await
    }

    async fn get_checkpoint(&self) -> Result<i64, PubrewardError> {
        self.inner.get_checkpoint().await
    }

    async fn advance_checkpoint(&self, timestamp: i64) -> Result<(), PubrewardError> {
        if take(&self.advance_failures) {
            return Err(injected("checkpoint advance"));
        }
        if take(&self.regress_advances) {
            let stored = self.inner.get_checkpoint().await?;
            return Err(PubrewardError::checkpoint_regression(stored.max(timestamp) + 1, timestamp));
        }
        self.inner.advance_checkpoint(timestamp).await
    }

    async fn upsert_message_record(&self, record: &MessageRecord) -> Result<bool, PubrewardError> {
        self.inner.upsert_message_record(record).await
    }

    async fn unseen_message_keys(&self, keys: &[String]) -> Result<Vec<String>, PubrewardError> {
        self.inner.unseen_message_keys(keys).await
    }

    async fn message_author(&self, message_key: &str) -> Result<Option<String>, PubrewardError> {
        self.inner.message_author(message_key).await
    }

    async fn apply_tally_delta(&self, delta: &TallyDelta) -> Result<(), PubrewardError> {
        self.inner.apply_tally_delta(delta).await
    }

    async fn get_tally(&self, message_key: &str) -> Result<Option<LikeTally>, PubrewardError> {
        self.inner.get_tally(message_key).await
    }

    async fn like_sums(&self, client_id: Option<&str>) -> Result<Vec<LikeSum>, PubrewardError> {
        self.inner.like_sums(client_id).await
    }

    async fn given_like_sums(
        &self,
        client_id: Option<&str>,
    ) -> Result<Vec<LikeSum>, PubrewardError> {
        self.inner.given_like_sums(client_id).await
    }

    async fn upsert_profile(&self, rename: &ProfileRename) -> Result<(), PubrewardError> {
        self.inner.upsert_profile(rename).await
    }

    async fn register_ledger_address(
        &self,
        client_id: &str,
        display_name: Option<&str>,
        address: &str,
    ) -> Result<(), PubrewardError> {
        self.inner
            .register_ledger_address(client_id, display_name, address)
            .await
    }

    async fn get_profile(&self, client_id: &str) -> Result<Option<IdentityProfile>, PubrewardError> {
        self.inner.get_profile(client_id).await
    }

    async fn list_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError> {
        self.inner.list_profiles().await
    }

    async fn list_registered_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError> {
        self.inner.list_registered_profiles().await
    }

    async fn insert_violation_if_absent(
        &self,
        record: &ViolationRecord,
    ) -> Result<bool, PubrewardError> {
        self.inner.insert_violation_if_absent(record).await
    }

    async fn update_violation(&self, update: &ViolationUpdate) -> Result<bool, PubrewardError> {
        self.inner.update_violation(update).await
    }

    async fn list_violations(
        &self,
        filter: &ViolationFilter,
    ) -> Result<Vec<ViolationRecord>, PubrewardError> {
        self.inner.list_violations(filter).await
    }

    async fn insert_sensitive_word_record(
        &self,
        record: &SensitiveWordRecord,
    ) -> Result<bool, PubrewardError> {
        self.inner.insert_sensitive_word_record(record).await
    }

    async fn update_sensitive_word_record(
        &self,
        message_key: &str,
        deal_tag: DealTag,
        deal_time: i64,
    ) -> Result<bool, PubrewardError> {
        self.inner
            .update_sensitive_word_record(message_key, deal_tag, deal_time)
            .await
    }

    async fn get_sensitive_word_record(
        &self,
        message_key: &str,
    ) -> Result<Option<SensitiveWordRecord>, PubrewardError> {
        self.inner.get_sensitive_word_record(message_key).await
    }

    async fn list_sensitive_word_records(
        &self,
        deal_tag: Option<DealTag>,
    ) -> Result<Vec<SensitiveWordRecord>, PubrewardError> {
        self.inner.list_sensitive_word_records(deal_tag).await
    }

    async fn has_pending_sensitive(&self, author_id: &str) -> Result<bool, PubrewardError> {
        self.inner.has_pending_sensitive(author_id).await
    }

    async fn select_blacklist(&self, identity: &str) -> Result<bool, PubrewardError> {
        self.inner.select_blacklist(identity).await
    }

    async fn add_to_blacklist(
        &self,
        identity: &str,
        reason: &str,
        time: i64,
    ) -> Result<(), PubrewardError> {
        self.inner.add_to_blacklist(identity, reason, time).await
    }

    async fn insert_user_task(&self, task: &UserTask) -> Result<bool, PubrewardError> {
        self.inner.insert_user_task(task).await
    }

    async fn list_user_tasks(
        &self,
        filter: &UserTaskFilter,
    ) -> Result<Vec<UserTask>, PubrewardError> {
        self.inner.list_user_tasks(filter).await
    }

    async fn record_bonus_owed(
        &self,
        counterpart: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError> {
        self.inner.record_bonus_owed(counterpart, amount).await
    }

    async fn bonus_owed(&self, counterpart: &str) -> Result<Option<TokenAmount>, PubrewardError> {
        self.inner.bonus_owed(counterpart).await
    }

    async fn mark_bonus_paid(&self, counterpart: &str) -> Result<(), PubrewardError> {
        self.inner.mark_bonus_paid(counterpart).await
    }

    async fn commit_batch(&self, batch: &BatchWrite) -> Result<BatchCommit, PubrewardError> {
        if take(&self.commit_failures) {
            return Err(injected("batch commit"));
        }
        self.inner.commit_batch(batch).await
    }

    async fn stats(&self) -> Result<StoreStats, PubrewardError> {
        self.inner.stats().await
    }
}
