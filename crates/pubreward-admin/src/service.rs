// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations behind the admin API.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pubreward_core::types::{
    DealTag, IdentityProfile, LikeSum, SensitiveWordRecord, TaskKind, UserTask, UserTaskFilter,
    ViolationFilter, ViolationRecord, validate_ledger_address,
};
use pubreward_core::{PubrewardError, StorageAdapter};
use pubreward_engine::Moderator;
use pubreward_ledger::ChannelReconciler;

use crate::pool::TaskPool;

/// Identity of the running pub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Whoami {
    pub pub_id: String,
    pub ledger_address: Option<String>,
}

pub struct AdminService {
    store: Arc<dyn StorageAdapter>,
    moderator: Arc<Moderator>,
    reconciler: Option<Arc<ChannelReconciler>>,
    pool: Arc<TaskPool>,
    cancel: CancellationToken,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        moderator: Arc<Moderator>,
        pool: Arc<TaskPool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            moderator,
            reconciler: None,
            pool,
            cancel,
        }
    }

    /// Opens reward channels for newly registered addresses.
    pub fn with_reconciler(mut self, reconciler: Arc<ChannelReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub async fn like_sums(&self, client_id: Option<&str>) -> Result<Vec<LikeSum>, PubrewardError> {
        self.store.like_sums(client_id).await
    }

    /// Net likes given by each voter, or by `client_id` alone.
    pub async fn given_like_sums(
        &self,
        client_id: Option<&str>,
    ) -> Result<Vec<LikeSum>, PubrewardError> {
        self.store.given_like_sums(client_id).await
    }

    pub async fn profiles(&self) -> Result<Vec<IdentityProfile>, PubrewardError> {
        self.store.list_profiles().await
    }

    pub async fn profile(&self, client_id: &str) -> Result<IdentityProfile, PubrewardError> {
        self.store
            .get_profile(client_id)
            .await?
            .ok_or_else(|| PubrewardError::NotFound(format!("no profile for {client_id}")))
    }

    /// Stores the ledger address of `client_id` and queues channel creation.
    ///
    /// The address is kept even when the queue is full; the next
    /// reconciliation sweep opens the channel instead.
    pub async fn register_address(
        &self,
        client_id: &str,
        name: Option<&str>,
        address: &str,
    ) -> Result<(), PubrewardError> {
        validate_ledger_address(address)?;
        self.store
            .register_ledger_address(client_id, name, address)
            .await?;
        info!(client_id, address, "ledger address registered");

        if let Some(reconciler) = &self.reconciler {
            let reconciler = Arc::clone(reconciler);
            let cancel = self.cancel.clone();
            let address = address.to_string();
            self.pool.try_submit(format!("ensure_channel {address}"), async move {
                reconciler.ensure_channel(&address, &cancel).await.map(|_| ())
            })?;
        }
        Ok(())
    }

    pub async fn report_violation(
        &self,
        plaintiff: &str,
        defendant: &str,
        message_key: &str,
        reasons: &str,
    ) -> Result<ViolationRecord, PubrewardError> {
        self.moderator
            .report_violation(plaintiff, defendant, message_key, reasons)
            .await
    }

    pub async fn list_violations(
        &self,
        filter: &ViolationFilter,
    ) -> Result<Vec<ViolationRecord>, PubrewardError> {
        self.store.list_violations(filter).await
    }

    pub async fn deal_violation(
        &self,
        plaintiff: &str,
        defendant: &str,
        message_key: &str,
        tag: DealTag,
    ) -> Result<(), PubrewardError> {
        self.moderator
            .deal_violation(plaintiff, defendant, message_key, tag)
            .await
    }

    pub async fn list_sensitive_words(
        &self,
        tag: Option<DealTag>,
    ) -> Result<Vec<SensitiveWordRecord>, PubrewardError> {
        self.store.list_sensitive_word_records(tag).await
    }

    pub async fn deal_sensitive_word(
        &self,
        message_key: &str,
        tag: DealTag,
    ) -> Result<(), PubrewardError> {
        self.moderator.deal_sensitive_word(message_key, tag).await
    }

    /// Collects a login of `client_id` at `login_time`.
    pub async fn notify_login(&self, client_id: &str, login_time: i64) -> Result<(), PubrewardError> {
        let task = self.task(client_id, TaskKind::Login, login_time)?;
        self.store.insert_user_task(&task).await?;
        debug!(client_id, login_time, "login collected");
        Ok(())
    }

    /// Collects an NFT minted by `client_id`. Each transaction is collected once.
    pub async fn notify_created_nft(
        &self,
        client_id: &str,
        created_time: i64,
        tx_hash: &str,
        token_id: &str,
        store_url: &str,
    ) -> Result<(), PubrewardError> {
        if tx_hash.trim().is_empty() {
            return Err(PubrewardError::InvalidInput("nft tx hash is empty".into()));
        }
        let task = UserTask {
            nft_tx_hash: Some(tx_hash.to_string()),
            nft_token_id: Some(token_id.to_string()),
            nft_store_url: Some(store_url.to_string()),
            ..self.task(client_id, TaskKind::NftCreated, created_time)?
        };
        if !self.store.insert_user_task(&task).await? {
            return Err(PubrewardError::Duplicate(format!(
                "nft transaction {tx_hash} was already collected"
            )));
        }
        info!(client_id, tx_hash, token_id, "created nft collected");
        Ok(())
    }

    pub async fn user_tasks(&self, filter: &UserTaskFilter) -> Result<Vec<UserTask>, PubrewardError> {
        if filter.client_id.trim().is_empty() {
            return Err(PubrewardError::InvalidInput("client_id is empty".into()));
        }
        if let (Some(start), Some(end)) = (filter.start_time, filter.end_time)
            && start > end
        {
            return Err(PubrewardError::InvalidInput(format!(
                "start_time {start} is after end_time {end}"
            )));
        }
        self.store.list_user_tasks(filter).await
    }

    fn task(&self, client_id: &str, kind: TaskKind, time: i64) -> Result<UserTask, PubrewardError> {
        if client_id.trim().is_empty() {
            return Err(PubrewardError::InvalidInput("client_id is empty".into()));
        }
        Ok(UserTask {
            pub_id: self.moderator.pub_id().to_string(),
            client_id: client_id.to_string(),
            kind,
            time,
            nft_tx_hash: None,
            nft_token_id: None,
            nft_store_url: None,
        })
    }

    pub fn whoami(&self) -> Whoami {
        Whoami {
            pub_id: self.moderator.pub_id().to_string(),
            ledger_address: self
                .reconciler
                .as_ref()
                .map(|r| r.self_address().to_string()),
        }
    }
}
