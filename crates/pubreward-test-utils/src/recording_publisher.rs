// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher that records contact messages instead of publishing them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pubreward_core::types::{AdapterType, HealthStatus};
use pubreward_core::{PluginAdapter, Publisher, PubrewardError};

/// A captured `publish_contact` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedContact {
    pub target: String,
    pub following: bool,
    pub blocking: bool,
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedContact>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<PublishedContact> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for RecordingPublisher {
    fn name(&self) -> &str {
        "recording-publisher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        Ok(())
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_contact(
        &self,
        target: &str,
        following: bool,
        blocking: bool,
    ) -> Result<(), PubrewardError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PubrewardError::Publish {
                message: "scripted publish failure".to_string(),
                source: None,
            });
        }
        self.published.lock().await.push(PublishedContact {
            target: target.to_string(),
            following,
            blocking,
        });
        Ok(())
    }
}
