// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound publisher backed by `sbotcli publish contact`.

use async_trait::async_trait;
use tracing::info;

use pubreward_config::model::FeedConfig;
use pubreward_core::{AdapterType, HealthStatus, PluginAdapter, Publisher, PubrewardError};

use crate::cli::{CliFailure, SbotCli};

/// Publishes contact messages as the identity the daemon is keyed with.
pub struct SbotCliPublisher {
    cli: SbotCli,
}

impl SbotCliPublisher {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            cli: SbotCli::from_config(config),
        }
    }
}

#[async_trait]
impl PluginAdapter for SbotCliPublisher {
    fn name(&self) -> &str {
        "sbotcli-publish"
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
impl Publisher for SbotCliPublisher {
    async fn publish_contact(
        &self,
        target: &str,
        following: bool,
        blocking: bool,
    ) -> Result<(), PubrewardError> {
        let args = [
            "publish".to_string(),
            "contact".to_string(),
            format!("--following={following}"),
            format!("--blocking={blocking}"),
            target.to_string(),
        ];
        self.cli.run(&args).await.map_err(|e| PubrewardError::Publish {
            message: format!("contact for {target}: {e}"),
            source: match e {
                CliFailure::Spawn(io) => Some(Box::new(io)),
                _ => None,
            },
        })?;
        info!(target, following, blocking, "published contact");
        Ok(())
    }
}
