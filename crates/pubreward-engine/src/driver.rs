// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The feed driver loop.
//!
//! One sequential task: read the checkpoint, fetch a batch, deduplicate,
//! classify, aggregate, commit, advance the checkpoint, then run the
//! counter-actions the batch produced. Channel reconciliation sweeps run
//! between batches once the sweep interval has elapsed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pubreward_config::model::FeedConfig;
use pubreward_core::types::{BatchCommit, ContactAction, Fact, FeedEnvelope};
use pubreward_core::{FeedSource, PubrewardError, StorageAdapter};
use pubreward_feed::classify;
use pubreward_ledger::ChannelReconciler;

use crate::aggregate::{BatchAccumulator, BatchSummary};
use crate::moderation::Moderator;

/// Result of one pass of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The feed had nothing newer than the checkpoint.
    Idle,
    Processed(BatchOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub fetched: usize,
    /// Envelopes skipped because their key was already stored.
    pub redelivered: usize,
    pub checkpoint: i64,
    pub summary: BatchSummary,
    pub commit: BatchCommit,
    pub actions: usize,
    pub actions_failed: usize,
}

/// Most a fetch is widened, as a multiple of the configured batch size, while
/// a full batch shares one timestamp.
const MAX_WIDENING: usize = 16;

/// Whether `envelopes` fills `limit` with a single timestamp.
fn full_at_one_timestamp(envelopes: &[FeedEnvelope], limit: usize) -> bool {
    envelopes.len() >= limit
        && envelopes
            .first()
            .is_some_and(|first| envelopes.iter().all(|e| e.timestamp == first.timestamp))
}

/// Checkpoint to store after processing `envelopes`.
///
/// A short batch advances to its highest timestamp. A full batch stops
/// below the last envelope's timestamp so that later envelopes sharing it
/// are fetched again. A full batch where every envelope has the same
/// timestamp has no lower value to stop at and advances to it; the driver
/// widens its fetch before accepting that.
pub fn next_checkpoint(envelopes: &[FeedEnvelope], batch_size: usize, current: i64) -> i64 {
    let Some(highest) = envelopes.iter().map(|e| e.timestamp).max() else {
        return current;
    };
    if envelopes.len() < batch_size {
        return highest.max(current);
    }
    match envelopes
        .iter()
        .map(|e| e.timestamp)
        .filter(|t| *t < highest)
        .max()
    {
        Some(below) => below.max(current),
        None => {
            warn!(
                timestamp = highest,
                batch_size, "full batch shares one timestamp, advancing past it"
            );
            highest.max(current)
        }
    }
}

pub struct FeedProcessor {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn StorageAdapter>,
    moderator: Arc<Moderator>,
    reconciler: Option<Arc<ChannelReconciler>>,
    config: FeedConfig,
    sweep_interval: Duration,
    last_sweep: Option<Instant>,
}

impl FeedProcessor {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn StorageAdapter>,
        moderator: Arc<Moderator>,
        config: FeedConfig,
    ) -> Self {
        Self {
            feed,
            store,
            moderator,
            reconciler: None,
            config,
            sweep_interval: Duration::ZERO,
            last_sweep: None,
        }
    }

    /// Runs a reconciliation sweep at most once per `interval`.
    pub fn with_reconciler(mut self, reconciler: Arc<ChannelReconciler>, interval: Duration) -> Self {
        self.reconciler = Some(reconciler);
        self.sweep_interval = interval;
        self
    }

    /// Runs until `cancel` fires.
    ///
    /// Transient failures are retried after the reconnect backoff. Errors
    /// that retrying cannot fix end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), PubrewardError> {
        info!(
            source = self.feed.name(),
            batch_size = self.config.batch_size,
            "feed driver started"
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.run_once(&cancel).await {
                Ok(Step::Processed(_)) => {}
                Ok(Step::Idle) => {
                    if !self.pause(&cancel, self.config.scan_interval()).await {
                        break;
                    }
                }
                Err(PubrewardError::Cancelled(_)) => break,
                Err(e @ PubrewardError::TransientSource { .. }) => {
                    warn!(error = %e, "feed read failed, reconnecting");
                    if !self.pause(&cancel, self.config.reconnect_backoff()).await {
                        break;
                    }
                    if let Err(e) = self.feed.reconnect().await {
                        warn!(error = %e, "reconnect failed");
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "batch aborted, checkpoint unchanged");
                    if !self.pause(&cancel, self.config.reconnect_backoff()).await {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
            self.maybe_sweep(&cancel).await;
        }
        info!("feed driver stopped");
        Ok(())
    }

    /// Sleeps for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, cancel: &CancellationToken, duration: Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Fetches and processes one batch.
    ///
    /// A full batch sharing one timestamp is fetched again with a doubled
    /// limit, up to `MAX_WIDENING` times the batch size, so that envelopes
    /// at that timestamp are not skipped.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> Result<Step, PubrewardError> {
        let current = self.store.get_checkpoint().await?;
        let max_limit = self.config.batch_size.saturating_mul(MAX_WIDENING);
        let mut limit = self.config.batch_size;
        let envelopes = loop {
            let fetched = self.fetch(cancel, current, limit).await?;
            if limit >= max_limit || !full_at_one_timestamp(&fetched, limit) {
                break fetched;
            }
            limit = limit.saturating_mul(2).min(max_limit);
            debug!(checkpoint = current, limit, "full batch shares one timestamp, widening fetch");
        };
        if envelopes.is_empty() {
            debug!(checkpoint = current, "feed caught up");
            return Ok(Step::Idle);
        }
        self.process(current, envelopes, limit)
            .await
            .map(Step::Processed)
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        after: i64,
        limit: usize,
    ) -> Result<Vec<FeedEnvelope>, PubrewardError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(PubrewardError::Cancelled("feed fetch".into())),
            fetched = self.feed.fetch_after(after, limit) => fetched,
        }
    }

    async fn process(
        &self,
        current: i64,
        envelopes: Vec<FeedEnvelope>,
        limit: usize,
    ) -> Result<BatchOutcome, PubrewardError> {
        let keys: Vec<String> = envelopes.iter().map(|e| e.key.clone()).collect();
        let unseen: HashSet<String> = self
            .store
            .unseen_message_keys(&keys)
            .await?
            .into_iter()
            .collect();

        let mut acc = BatchAccumulator::new(self.config.vote_rule);
        let mut actions: Vec<ContactAction> = Vec::new();
        for envelope in envelopes.iter().filter(|e| unseen.contains(&e.key)) {
            let classified = classify(envelope);
            if !acc.observe(envelope, &classified.facts) {
                continue;
            }
            for fact in &classified.facts {
                match fact {
                    Fact::Post { text, .. } => {
                        if let Some(record) = self.moderator.evaluate_post(envelope, text) {
                            acc.flag(record);
                        }
                    }
                    Fact::ContactEdge {
                        target,
                        following,
                        blocking,
                        ..
                    } => {
                        if let Some(action) = self
                            .moderator
                            .evaluate_contact(envelope, target, *following, *blocking)
                            .await?
                        {
                            actions.push(action);
                        }
                    }
                    Fact::Vote { .. } | Fact::Rename { .. } => {}
                }
            }
        }

        let (write, summary) = acc.finish(self.store.as_ref()).await?;
        let commit = if write.is_empty() {
            BatchCommit::default()
        } else {
            self.store.commit_batch(&write).await?
        };

        let checkpoint = next_checkpoint(&envelopes, limit, current);
        if checkpoint > current {
            self.store.advance_checkpoint(checkpoint).await?;
        }

        let mut actions_failed = 0;
        for action in &actions {
            if let Err(e) = self.moderator.execute(action).await {
                warn!(target = %action.target, error = %e, "counter-action failed");
                actions_failed += 1;
            }
        }

        counter!("pubreward_batches_total").increment(1);
        counter!("pubreward_messages_total").increment(summary.new_messages as u64);
        info!(
            fetched = envelopes.len(),
            new = summary.new_messages,
            likes = summary.likes,
            unlikes = summary.unlikes,
            net_zero = summary.net_zero,
            renames = summary.renames,
            flagged = summary.flagged,
            checkpoint,
            "batch committed"
        );

        Ok(BatchOutcome {
            fetched: envelopes.len(),
            redelivered: envelopes.iter().filter(|e| !unseen.contains(&e.key)).count(),
            checkpoint,
            summary,
            commit,
            actions: actions.len(),
            actions_failed,
        })
    }

    async fn maybe_sweep(&mut self, cancel: &CancellationToken) {
        let Some(reconciler) = self.reconciler.clone() else {
            return;
        };
        if self
            .last_sweep
            .is_some_and(|at| at.elapsed() < self.sweep_interval)
        {
            return;
        }
        self.last_sweep = Some(Instant::now());
        if let Err(e) = reconciler.reconcile_all(cancel).await {
            warn!(error = %e, "reconciliation sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordmatch::WordMatcher;
    use pubreward_test_utils::fixtures::{self, PUB_ID, temp_storage};
    use pubreward_test_utils::{MemoryFeed, RecordingPublisher};
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn failed_counter_action_is_logged() {
        let (_dir, store) = temp_storage().await;
        let store: Arc<dyn StorageAdapter> = Arc::new(store);
        store.add_to_blacklist("@mallory", "spam", 1).await.unwrap();
        let publisher = Arc::new(RecordingPublisher::new());
        publisher.fail();
        let moderator = Arc::new(Moderator::new(
            PUB_ID,
            WordMatcher::empty(),
            store.clone(),
            publisher,
        ));
        let feed = Arc::new(MemoryFeed::with(vec![fixtures::contact(
            "%c1", PUB_ID, 3, "@mallory", true, false,
        )]));
        let mut processor = FeedProcessor::new(feed, store, moderator, FeedConfig::default());

        processor.run_once(&CancellationToken::new()).await.unwrap();
        assert!(logs_contain("counter-action failed"));
    }

    fn at(ts: &[i64]) -> Vec<FeedEnvelope> {
        ts.iter()
            .enumerate()
            .map(|(i, t)| fixtures::post(&format!("%{i}"), "@a", *t, "x"))
            .collect()
    }

    #[test]
    fn short_batch_advances_to_highest() {
        assert_eq!(next_checkpoint(&at(&[5, 6, 9]), 10, 0), 9);
        assert_eq!(next_checkpoint(&[], 10, 4), 4);
    }

    #[test]
    fn full_batch_stops_below_boundary_timestamp() {
        assert_eq!(next_checkpoint(&at(&[5, 6, 9, 9]), 4, 0), 6);
        assert_eq!(next_checkpoint(&at(&[5, 6, 7, 9]), 4, 0), 7);
    }

    #[test]
    fn full_batch_of_one_timestamp_advances_to_it() {
        assert_eq!(next_checkpoint(&at(&[8, 8, 8]), 3, 2), 8);
    }

    #[test]
    fn only_full_single_timestamp_batches_need_widening() {
        assert!(full_at_one_timestamp(&at(&[4, 4]), 2));
        assert!(!full_at_one_timestamp(&at(&[4, 5]), 2));
        assert!(!full_at_one_timestamp(&at(&[4]), 2));
        assert!(!full_at_one_timestamp(&[], 0));
    }

    #[tokio::test]
    async fn widening_stops_at_the_cap() {
        let (_dir, store) = temp_storage().await;
        let store: Arc<dyn StorageAdapter> = Arc::new(store);
        let moderator = Arc::new(Moderator::new(
            PUB_ID,
            WordMatcher::empty(),
            store.clone(),
            Arc::new(RecordingPublisher::new()),
        ));
        let envelopes: Vec<FeedEnvelope> = (0..40)
            .map(|i| fixtures::post(&format!("%p{i}"), "@a", 7, "x"))
            .collect();
        let feed = Arc::new(MemoryFeed::with(envelopes));
        let config = FeedConfig {
            batch_size: 1,
            ..FeedConfig::default()
        };
        let mut processor = FeedProcessor::new(feed.clone(), store.clone(), moderator, config);

        let Step::Processed(outcome) = processor.run_once(&CancellationToken::new()).await.unwrap()
        else {
            panic!("expected a processed batch");
        };
        // Limits 1, 2, 4, 8, 16.
        assert_eq!(feed.fetch_count(), 5);
        assert_eq!(outcome.fetched, MAX_WIDENING);
        assert_eq!(outcome.checkpoint, 7);
    }

    #[test]
    fn never_moves_backwards() {
        assert_eq!(next_checkpoint(&at(&[1, 2, 3]), 3, 10), 10);
    }

    proptest::proptest! {
        #[test]
        fn full_batch_never_passes_its_boundary(mut ts in proptest::collection::vec(0i64..50, 2..20)) {
            ts.sort_unstable();
            let highest = *ts.last().unwrap();
            let envelopes = at(&ts);
            let next = next_checkpoint(&envelopes, ts.len(), 0);
            proptest::prop_assert!(next <= highest);
            if ts.iter().any(|t| *t < highest) {
                proptest::prop_assert!(next < highest);
            }
        }
    }
}
