// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the checkpoint and derived tables.

use async_trait::async_trait;

use crate::error::PubrewardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    BatchCommit, BatchWrite, DealTag, IdentityProfile, LikeSum, LikeTally, MessageRecord,
    ProfileRename, SensitiveWordRecord, StoreStats, TallyDelta, TokenAmount, UserTask,
    UserTaskFilter, ViolationFilter, ViolationRecord, ViolationUpdate,
};

/// Adapter for the local persistence backend.
///
/// Every operation is narrow and single-purpose. All values reach the
/// backend as bound parameters. Upserts are idempotent so that a batch
/// replayed after a crash converges to the same state.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), PubrewardError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), PubrewardError>;

    // --- Checkpoint ---

    /// Returns the last fully processed feed time, or `0` when unset.
    async fn get_checkpoint(&self) -> Result<i64, PubrewardError>;

    /// Moves the checkpoint to `timestamp`.
    ///
    /// Fails with a persistence error when `timestamp` is below the stored value.
    async fn advance_checkpoint(&self, timestamp: i64) -> Result<(), PubrewardError>;

    // --- Messages and tallies ---

    /// Inserts the record unless its key is already known. Returns `true` if inserted.
    async fn upsert_message_record(&self, record: &MessageRecord) -> Result<bool, PubrewardError>;

    /// Returns the subset of `keys` that has no stored message record.
    async fn unseen_message_keys(&self, keys: &[String]) -> Result<Vec<String>, PubrewardError>;

    /// Resolves the author of a stored message.
    async fn message_author(&self, message_key: &str) -> Result<Option<String>, PubrewardError>;

    /// Adds `delta.delta` to the tally of `delta.message_key`.
    async fn apply_tally_delta(&self, delta: &TallyDelta) -> Result<(), PubrewardError>;

    /// Returns the tally of one message.
    async fn get_tally(&self, message_key: &str) -> Result<Option<LikeTally>, PubrewardError>;

    /// Net likes per author, optionally restricted to one identity.
    async fn like_sums(&self, client_id: Option<&str>) -> Result<Vec<LikeSum>, PubrewardError>;

    /// Net likes per voter, optionally restricted to one identity.
    async fn given_like_sums(
        &self,
        client_id: Option<&str>,
    ) -> Result<Vec<LikeSum>, PubrewardError>;

    // --- Profiles ---

    /// Binds a display name to an identity. Leaves other profile fields untouched.
    async fn upsert_profile(&self, rename: &ProfileRename) -> Result<(), PubrewardError>;

    /// Records the ledger address an identity registered, optionally with a name.
    async fn register_ledger_address(
        &self,
        client_id: &str,
        display_name: Option<&str>,
        address: &str,
    ) -> Result<(), PubrewardError>;

    async fn get_profile(&self, client_id: &str) -> Result<Option<IdentityProfile>, PubrewardError>;

    async fn list_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError>;

    /// Profiles that have a registered ledger address.
    async fn list_registered_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError>;

    // --- Moderation records ---

    /// Inserts a pending violation unless an open one exists for the same
    /// (plaintiff, defendant, message_key). Returns `true` if inserted.
    async fn insert_violation_if_absent(
        &self,
        record: &ViolationRecord,
    ) -> Result<bool, PubrewardError>;

    /// Resolves the open violation for the triple. Returns `true` if a row changed.
    async fn update_violation(&self, update: &ViolationUpdate) -> Result<bool, PubrewardError>;

    async fn list_violations(
        &self,
        filter: &ViolationFilter,
    ) -> Result<Vec<ViolationRecord>, PubrewardError>;

    /// Appends a sensitive-word record. Returns `false` if one exists for the message.
    async fn insert_sensitive_word_record(
        &self,
        record: &SensitiveWordRecord,
    ) -> Result<bool, PubrewardError>;

    /// Sets the deal tag of the record for `message_key`. Returns `true` if a row changed.
    async fn update_sensitive_word_record(
        &self,
        message_key: &str,
        deal_tag: DealTag,
        deal_time: i64,
    ) -> Result<bool, PubrewardError>;

    async fn get_sensitive_word_record(
        &self,
        message_key: &str,
    ) -> Result<Option<SensitiveWordRecord>, PubrewardError>;

    async fn list_sensitive_word_records(
        &self,
        deal_tag: Option<DealTag>,
    ) -> Result<Vec<SensitiveWordRecord>, PubrewardError>;

    /// Whether `author_id` has a sensitive-word record awaiting review.
    async fn has_pending_sensitive(&self, author_id: &str) -> Result<bool, PubrewardError>;

    // --- Blacklist ---

    /// Whether `identity` is on the blacklist.
    async fn select_blacklist(&self, identity: &str) -> Result<bool, PubrewardError>;

    async fn add_to_blacklist(
        &self,
        identity: &str,
        reason: &str,
        time: i64,
    ) -> Result<(), PubrewardError>;

    // --- User tasks ---

    /// Appends a task. Returns `false` when its NFT transaction was already collected.
    async fn insert_user_task(&self, task: &UserTask) -> Result<bool, PubrewardError>;

    async fn list_user_tasks(&self, filter: &UserTaskFilter)
        -> Result<Vec<UserTask>, PubrewardError>;

    // --- Registration bonus ---

    /// Records a bonus owed to a ledger counterpart. A counterpart that was
    /// already owed a bonus, paid or not, keeps its original entry.
    async fn record_bonus_owed(
        &self,
        counterpart: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError>;

    /// The unpaid bonus owed to `counterpart`, if any.
    async fn bonus_owed(&self, counterpart: &str) -> Result<Option<TokenAmount>, PubrewardError>;

    /// Marks the bonus owed to `counterpart` as paid.
    async fn mark_bonus_paid(&self, counterpart: &str) -> Result<(), PubrewardError>;

    // --- Batches ---

    /// Applies every write of one batch in a single transaction.
    async fn commit_batch(&self, batch: &BatchWrite) -> Result<BatchCommit, PubrewardError>;

    /// Row counts for operator status output.
    async fn stats(&self) -> Result<StoreStats, PubrewardError>;
}
