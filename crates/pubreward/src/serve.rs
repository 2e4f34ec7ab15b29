// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pubreward serve` and `pubreward sweep`.
//!
//! Wires storage, the feed adapters, the ledger, moderation, and the admin
//! API together and runs them until shutdown.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use pubreward_admin::{AdminService, TaskPool, build_router};
use pubreward_config::PubrewardConfig;
use pubreward_core::types::HealthStatus;
use pubreward_core::{FeedSource, PluginAdapter, PubrewardError, StorageAdapter};
use pubreward_engine::{FeedProcessor, Moderator, WordMatcher};
use pubreward_feed::{SbotCliPublisher, SbotCliSource};
use pubreward_ledger::{ChannelReconciler, PhotonClient};
use pubreward_storage::SqliteStorage;

use crate::shutdown;

struct Components {
    store: Arc<SqliteStorage>,
    reconciler: Option<Arc<ChannelReconciler>>,
    moderator: Arc<Moderator>,
}

fn build_reconciler(
    config: &PubrewardConfig,
    store: Arc<dyn StorageAdapter>,
) -> Result<Option<Arc<ChannelReconciler>>, PubrewardError> {
    if !config.ledger.enabled {
        info!("ledger disabled, no channels or rewards");
        return Ok(None);
    }
    let client = PhotonClient::new(&config.ledger)?;
    Ok(Some(Arc::new(ChannelReconciler::new(
        Arc::new(client),
        store,
        config.ledger.clone(),
    ))))
}

/// The identity the pub publishes as.
///
/// `node.identity` wins when set. Otherwise the daemon is asked, and
/// startup fails if it cannot answer: moderation needs to know which
/// identity it must never target.
async fn resolve_identity(
    config: &PubrewardConfig,
    feed: &SbotCliSource,
) -> Result<String, PubrewardError> {
    if let Some(identity) = &config.node.identity {
        return Ok(identity.clone());
    }
    let identity = feed.whoami().await.map_err(|e| {
        PubrewardError::Config(format!(
            "node.identity is unset and the feed daemon did not report one: {e}"
        ))
    })?;
    info!(identity = %identity, "pub identity resolved from feed daemon");
    Ok(identity)
}

async fn build(config: &PubrewardConfig, pub_id: String) -> Result<Components, PubrewardError> {
    let store = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let store_dyn: Arc<dyn StorageAdapter> = store.clone();
    let reconciler = build_reconciler(config, store_dyn.clone())?;

    let matcher = match &config.moderation.wordlist_path {
        Some(path) => WordMatcher::from_file(Path::new(path), config.moderation.case_insensitive)?,
        None => WordMatcher::empty(),
    };
    let publisher = Arc::new(SbotCliPublisher::new(&config.feed));
    let mut moderator = Moderator::new(pub_id, matcher, store_dyn, publisher);
    if let Some(reconciler) = &reconciler {
        moderator = moderator.with_rewards(Arc::clone(reconciler), config.ledger.report_reward_finney);
    }

    Ok(Components {
        store,
        reconciler,
        moderator: Arc::new(moderator),
    })
}

async fn report_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter not healthy at startup")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "health check failed"),
    }
}

/// Runs the driver loop, the task pool, and the admin API until a signal arrives.
pub async fn run_serve(config: PubrewardConfig) -> Result<(), PubrewardError> {
    init_tracing(&config.node.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "pubreward starting");

    let cancel = shutdown::install_signal_handler();
    let feed = Arc::new(SbotCliSource::new(&config.feed));
    report_health(feed.as_ref()).await;
    let pub_id = resolve_identity(&config, &feed).await?;

    let Components {
        store,
        reconciler,
        moderator,
    } = build(&config, pub_id).await?;
    let store_dyn: Arc<dyn StorageAdapter> = store.clone();

    let pool = Arc::new(TaskPool::start(
        config.admin.workers,
        config.admin.queue_capacity,
        cancel.clone(),
    ));

    let admin_task = if config.admin.enabled {
        let mut service = AdminService::new(
            store_dyn.clone(),
            moderator.clone(),
            pool.clone(),
            cancel.clone(),
        );
        if let Some(reconciler) = &reconciler {
            service = service.with_reconciler(Arc::clone(reconciler));
        }
        let router = build_router(Arc::new(service));
        let admin = config.admin.clone();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            pubreward_admin::serve(&admin, router, cancel).await
        }))
    } else {
        None
    };

    let feed_dyn: Arc<dyn FeedSource> = feed.clone();
    let mut processor = FeedProcessor::new(feed_dyn, store_dyn, moderator, config.feed.clone());
    if let Some(reconciler) = reconciler {
        processor = processor.with_reconciler(reconciler, config.ledger.sweep_interval());
    }

    let result = processor.run(cancel.clone()).await;
    if let Err(e) = &result {
        error!(error = %e, "feed driver failed");
    }

    cancel.cancel();
    pool.shutdown().await;
    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "admin API exited with error"),
            Err(e) => warn!(error = %e, "admin API task panicked"),
        }
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    info!("pubreward stopped");
    result
}

/// Runs a single reconciliation sweep.
pub async fn run_sweep(config: PubrewardConfig) -> Result<(), PubrewardError> {
    init_tracing(&config.node.log_level);
    let cancel = shutdown::install_signal_handler();
    let store = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let Some(reconciler) = build_reconciler(&config, store.clone())? else {
        return Err(PubrewardError::Config(
            "ledger.enabled is false, nothing to sweep".into(),
        ));
    };

    let report = reconciler.reconcile_all(&cancel).await;
    cancel.cancel();
    store.shutdown().await?;
    let report = report?;

    println!(
        "checked {}, healthy {}, opened {}, topped up {}, bonus paid {}, failed {}",
        report.checked,
        report.healthy,
        report.opened,
        report.topped_up,
        report.bonus_paid,
        report.failed.len()
    );
    for (counterpart, reason) in &report.failed {
        println!("  {counterpart}: {reason}");
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pubreward={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const ID: &str = "@HZnU6wM+F17J0RSLXP05x3Lag2jGv3F3LzHMjh72coE=.ed25519";

    fn config_with_client(script: &str) -> PubrewardConfig {
        let mut config = PubrewardConfig::default();
        config.feed.sbotcli_path = "sh".into();
        config.feed.extra_args = vec!["-c".into(), script.into()];
        config.feed.fetch_timeout_secs = 5;
        config
    }

    #[tokio::test]
    async fn configured_identity_is_used_as_is() {
        let mut config = config_with_client("exit 1");
        config.node.identity = Some(ID.to_string());
        let feed = SbotCliSource::new(&config.feed);
        assert_eq!(resolve_identity(&config, &feed).await.unwrap(), ID);
    }

    #[tokio::test]
    async fn unset_identity_is_asked_from_daemon() {
        let config = config_with_client(&format!("echo '{ID}'"));
        let feed = SbotCliSource::new(&config.feed);
        assert_eq!(resolve_identity(&config, &feed).await.unwrap(), ID);
    }

    #[tokio::test]
    async fn unset_identity_without_daemon_refuses_to_start() {
        let mut config = PubrewardConfig::default();
        config.feed.sbotcli_path = "/nonexistent/sbotcli".into();
        let feed = SbotCliSource::new(&config.feed);
        let err = resolve_identity(&config, &feed).await.unwrap_err();
        assert!(matches!(err, PubrewardError::Config(_)));
    }
}
