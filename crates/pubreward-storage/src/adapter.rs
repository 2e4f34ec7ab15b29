// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use pubreward_config::model::StorageConfig;
use pubreward_core::types::{
    BatchCommit, BatchWrite, DealTag, IdentityProfile, LikeSum, LikeTally, MessageRecord,
    ProfileRename, SensitiveWordRecord, StoreStats, TallyDelta, TokenAmount, UserTask,
    UserTaskFilter, ViolationFilter, ViolationRecord, ViolationUpdate,
};
use pubreward_core::{AdapterType, HealthStatus, PluginAdapter, PubrewardError, StorageAdapter};

use crate::database::Database;
use crate::queries::{self, checkpoint::Advance};

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, PubrewardError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, PubrewardError> {
        self.db.get().ok_or_else(|| {
            PubrewardError::persistence("storage not initialized -- call initialize() first")
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        self.db()?
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        if let Some(db) = self.db.get() {
            db.checkpoint_wal().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), PubrewardError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| PubrewardError::persistence("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PubrewardError> {
        self.db()?.checkpoint_wal().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Checkpoint ---

    async fn get_checkpoint(&self) -> Result<i64, PubrewardError> {
        self.db()?.call(|conn| queries::checkpoint::get(conn)).await
    }

    async fn advance_checkpoint(&self, timestamp: i64) -> Result<(), PubrewardError> {
        let outcome = self
            .db()?
            .call(move |conn| queries::checkpoint::advance(conn, timestamp))
            .await?;
        match outcome {
            Advance::Advanced => Ok(()),
            Advance::Regressed { stored } => {
                Err(PubrewardError::checkpoint_regression(stored, timestamp))
            }
        }
    }

    // --- Messages and tallies ---

    async fn upsert_message_record(&self, record: &MessageRecord) -> Result<bool, PubrewardError> {
        let record = record.clone();
        self.db()?
            .call(move |conn| queries::messages::insert_if_absent(conn, &record))
            .await
    }

    async fn unseen_message_keys(&self, keys: &[String]) -> Result<Vec<String>, PubrewardError> {
        let keys = keys.to_vec();
        self.db()?
            .call(move |conn| queries::messages::unseen(conn, &keys))
            .await
    }

    async fn message_author(&self, message_key: &str) -> Result<Option<String>, PubrewardError> {
        let key = message_key.to_string();
        self.db()?
            .call(move |conn| queries::messages::author_of(conn, &key))
            .await
    }

    async fn apply_tally_delta(&self, delta: &TallyDelta) -> Result<(), PubrewardError> {
        let delta = delta.clone();
        self.db()?
            .call(move |conn| queries::tallies::apply_delta(conn, &delta))
            .await
    }

    async fn get_tally(&self, message_key: &str) -> Result<Option<LikeTally>, PubrewardError> {
        let key = message_key.to_string();
        self.db()?
            .call(move |conn| queries::tallies::get(conn, &key))
            .await
    }

    async fn like_sums(&self, client_id: Option<&str>) -> Result<Vec<LikeSum>, PubrewardError> {
        let client_id = client_id.map(str::to_string);
        self.db()?
            .call(move |conn| queries::tallies::like_sums(conn, client_id.as_deref()))
            .await
    }

    async fn given_like_sums(
        &self,
        client_id: Option<&str>,
    ) -> Result<Vec<LikeSum>, PubrewardError> {
        let client_id = client_id.map(str::to_string);
        self.db()?
            .call(move |conn| queries::tallies::given_like_sums(conn, client_id.as_deref()))
            .await
    }

    // --- Profiles ---

    async fn upsert_profile(&self, rename: &ProfileRename) -> Result<(), PubrewardError> {
        let rename = rename.clone();
        self.db()?
            .call(move |conn| queries::profiles::upsert_name(conn, &rename).map(|_| ()))
            .await
    }

    async fn register_ledger_address(
        &self,
        client_id: &str,
        display_name: Option<&str>,
        address: &str,
    ) -> Result<(), PubrewardError> {
        let client_id = client_id.to_string();
        let display_name = display_name.map(str::to_string);
        let address = address.to_string();
        self.db()?
            .call(move |conn| {
                queries::profiles::register_address(
                    conn,
                    &client_id,
                    display_name.as_deref(),
                    &address,
                )
            })
            .await
    }

    async fn get_profile(&self, client_id: &str) -> Result<Option<IdentityProfile>, PubrewardError> {
        let client_id = client_id.to_string();
        self.db()?
            .call(move |conn| queries::profiles::get(conn, &client_id))
            .await
    }

    async fn list_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError> {
        self.db()?.call(|conn| queries::profiles::list(conn)).await
    }

    async fn list_registered_profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError> {
        self.db()?
            .call(|conn| queries::profiles::list_registered(conn))
            .await
    }

    // --- Moderation records ---

    async fn insert_violation_if_absent(
        &self,
        record: &ViolationRecord,
    ) -> Result<bool, PubrewardError> {
        let record = record.clone();
        self.db()?
            .call(move |conn| queries::violations::insert_if_absent(conn, &record))
            .await
    }

    async fn update_violation(&self, update: &ViolationUpdate) -> Result<bool, PubrewardError> {
        let update = update.clone();
        self.db()?
            .call(move |conn| queries::violations::update(conn, &update))
            .await
    }

    async fn list_violations(
        &self,
        filter: &ViolationFilter,
    ) -> Result<Vec<ViolationRecord>, PubrewardError> {
        let filter = filter.clone();
        self.db()?
            .call(move |conn| queries::violations::list(conn, &filter))
            .await
    }

    async fn insert_sensitive_word_record(
        &self,
        record: &SensitiveWordRecord,
    ) -> Result<bool, PubrewardError> {
        let record = record.clone();
        self.db()?
            .call(move |conn| queries::sensitive::insert(conn, &record))
            .await
    }

    async fn update_sensitive_word_record(
        &self,
        message_key: &str,
        deal_tag: DealTag,
        deal_time: i64,
    ) -> Result<bool, PubrewardError> {
        let key = message_key.to_string();
        self.db()?
            .call(move |conn| queries::sensitive::update(conn, &key, deal_tag, deal_time))
            .await
    }

    async fn get_sensitive_word_record(
        &self,
        message_key: &str,
    ) -> Result<Option<SensitiveWordRecord>, PubrewardError> {
        let key = message_key.to_string();
        self.db()?
            .call(move |conn| queries::sensitive::get(conn, &key))
            .await
    }

    async fn list_sensitive_word_records(
        &self,
        deal_tag: Option<DealTag>,
    ) -> Result<Vec<SensitiveWordRecord>, PubrewardError> {
        self.db()?
            .call(move |conn| queries::sensitive::list(conn, deal_tag))
            .await
    }

    async fn has_pending_sensitive(&self, author_id: &str) -> Result<bool, PubrewardError> {
        let author = author_id.to_string();
        self.db()?
            .call(move |conn| queries::sensitive::has_pending(conn, &author))
            .await
    }

    // --- Blacklist ---

    async fn select_blacklist(&self, identity: &str) -> Result<bool, PubrewardError> {
        let identity = identity.to_string();
        self.db()?
            .call(move |conn| queries::blacklist::contains(conn, &identity))
            .await
    }

    async fn add_to_blacklist(
        &self,
        identity: &str,
        reason: &str,
        time: i64,
    ) -> Result<(), PubrewardError> {
        let identity = identity.to_string();
        let reason = reason.to_string();
        self.db()?
            .call(move |conn| queries::blacklist::add(conn, &identity, &reason, time))
            .await
    }

    // --- User tasks ---

    async fn insert_user_task(&self, task: &UserTask) -> Result<bool, PubrewardError> {
        let task = task.clone();
        self.db()?
            .call(move |conn| queries::tasks::insert(conn, &task))
            .await
    }

    async fn list_user_tasks(
        &self,
        filter: &UserTaskFilter,
    ) -> Result<Vec<UserTask>, PubrewardError> {
        let filter = filter.clone();
        self.db()?
            .call(move |conn| queries::tasks::list(conn, &filter))
            .await
    }

    // --- Registration bonus ---

    async fn record_bonus_owed(
        &self,
        counterpart: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError> {
        let counterpart = counterpart.to_string();
        self.db()?
            .call(move |conn| queries::bonus::record_owed(conn, &counterpart, amount))
            .await
    }

    async fn bonus_owed(&self, counterpart: &str) -> Result<Option<TokenAmount>, PubrewardError> {
        let counterpart = counterpart.to_string();
        self.db()?
            .call(move |conn| queries::bonus::owed(conn, &counterpart))
            .await
    }

    async fn mark_bonus_paid(&self, counterpart: &str) -> Result<(), PubrewardError> {
        let counterpart = counterpart.to_string();
        self.db()?
            .call(move |conn| queries::bonus::mark_paid(conn, &counterpart).map(|_| ()))
            .await
    }

    // --- Batches ---

    async fn commit_batch(&self, batch: &BatchWrite) -> Result<BatchCommit, PubrewardError> {
        let batch = batch.clone();
        self.db()?
            .call(move |conn| queries::batch::commit(conn, &batch))
            .await
    }

    async fn stats(&self) -> Result<StoreStats, PubrewardError> {
        self.db()?.call(|conn| queries::stats::collect(conn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubreward_core::CheckpointRegression;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(matches!(
            storage.get_checkpoint().await,
            Err(PubrewardError::Persistence { .. })
        ));
    }

    #[tokio::test]
    async fn checkpoint_regression_surfaces_as_persistence_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("checkpoint.db");
        let storage = SqliteStorage::open(make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        assert_eq!(storage.get_checkpoint().await.unwrap(), 0);
        storage.advance_checkpoint(1_000).await.unwrap();

        let err = storage.advance_checkpoint(999).await.unwrap_err();
        let PubrewardError::Persistence { source } = &err else {
            panic!("expected persistence error, got {err:?}");
        };
        assert_eq!(
            source.downcast_ref::<CheckpointRegression>(),
            Some(&CheckpointRegression {
                stored: 1_000,
                attempted: 999
            })
        );
        assert_eq!(storage.get_checkpoint().await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn checkpoint_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();
        {
            let storage = SqliteStorage::open(make_config(path)).await.unwrap();
            storage.advance_checkpoint(42).await.unwrap();
            storage.close().await.unwrap();
        }
        let storage = SqliteStorage::open(make_config(path)).await.unwrap();
        assert_eq!(storage.get_checkpoint().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::open(make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();
        storage.add_to_blacklist("@eve", "test", 1).await.unwrap();
        storage.shutdown().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
