// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory feed source for deterministic driver tests.
//!
//! `MemoryFeed` holds an append-only list of envelopes and serves them with
//! the same strictly-greater-than contract as the real source. Failures can
//! be scripted to exercise the reconnect path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pubreward_core::types::{AdapterType, FeedEnvelope, HealthStatus};
use pubreward_core::{FeedSource, PluginAdapter, PubrewardError};

pub struct MemoryFeed {
    envelopes: Arc<Mutex<Vec<FeedEnvelope>>>,
    fail_next: AtomicUsize,
    fetches: AtomicUsize,
    reconnects: AtomicUsize,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self {
            envelopes: Arc::new(Mutex::new(Vec::new())),
            fail_next: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
        }
    }

    /// Creates a feed pre-loaded with `envelopes`.
    pub fn with(envelopes: Vec<FeedEnvelope>) -> Self {
        Self {
            envelopes: Arc::new(Mutex::new(envelopes)),
            ..Self::new()
        }
    }

    /// Appends an envelope. Later envelopes with equal timestamps are served
    /// after earlier ones.
    pub async fn push(&self, envelope: FeedEnvelope) {
        self.envelopes.lock().await.push(envelope);
    }

    /// Makes the next `n` fetches fail with a transient error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryFeed {
    fn name(&self) -> &str {
        "memory-feed"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Feed
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        Ok(())
    }
}

#[async_trait]
impl FeedSource for MemoryFeed {
    async fn fetch_after(
        &self,
        after: i64,
        limit: usize,
    ) -> Result<Vec<FeedEnvelope>, PubrewardError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PubrewardError::TransientSource {
                message: "scripted feed failure".to_string(),
                source: None,
            });
        }

        let mut batch: Vec<FeedEnvelope> = self
            .envelopes
            .lock()
            .await
            .iter()
            .filter(|e| e.timestamp > after)
            .cloned()
            .collect();
        batch.sort_by_key(|e| e.timestamp);
        batch.truncate(limit);
        Ok(batch)
    }

    async fn reconnect(&self) -> Result<(), PubrewardError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
