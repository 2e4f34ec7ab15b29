// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed source backed by `sbotcli log`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use pubreward_config::model::FeedConfig;
use pubreward_core::types::FeedEnvelope;
use pubreward_core::{AdapterType, FeedSource, HealthStatus, PluginAdapter, PubrewardError};

use crate::cli::{CliFailure, SbotCli};
use crate::envelope::decode_stream;

/// Reads the local daemon's log with one `sbotcli log --gt T --limit N`
/// invocation per batch.
pub struct SbotCliSource {
    cli: SbotCli,
}

impl SbotCliSource {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            cli: SbotCli::from_config(config),
        }
    }

    /// Asks the daemon which identity it publishes as.
    pub async fn whoami(&self) -> Result<String, PubrewardError> {
        let stdout = self
            .cli
            .run(&["whoami".to_string()])
            .await
            .map_err(|e| transient("whoami failed", e))?;
        parse_whoami(&stdout).ok_or_else(|| PubrewardError::TransientSource {
            message: format!(
                "whoami printed no feed identity: {}",
                String::from_utf8_lossy(&stdout).trim()
            ),
            source: None,
        })
    }
}

#[derive(Deserialize)]
struct WhoamiReply {
    id: String,
}

/// Accepts `{"id":"@..."}` or a bare identity on one line.
fn parse_whoami(stdout: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    let id = match serde_json::from_str::<WhoamiReply>(text) {
        Ok(reply) => reply.id,
        Err(_) => text.to_string(),
    };
    (id.starts_with('@') && id.ends_with(".ed25519")).then_some(id)
}

fn transient(context: &str, failure: CliFailure) -> PubrewardError {
    PubrewardError::TransientSource {
        message: format!("{context}: {failure}"),
        source: match failure {
            CliFailure::Spawn(e) => Some(Box::new(e)),
            _ => None,
        },
    }
}

#[async_trait]
impl PluginAdapter for SbotCliSource {
    fn name(&self) -> &str {
        "sbotcli-log"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Feed
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        match self.cli.run(&["whoami".to_string()]).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        Ok(())
    }
}

#[async_trait]
impl FeedSource for SbotCliSource {
    async fn fetch_after(
        &self,
        after: i64,
        limit: usize,
    ) -> Result<Vec<FeedEnvelope>, PubrewardError> {
        let args = [
            "log".to_string(),
            "--gt".to_string(),
            after.to_string(),
            "--limit".to_string(),
            limit.to_string(),
        ];
        let stdout = self
            .cli
            .run(&args)
            .await
            .map_err(|e| transient("feed read failed", e))?;

        let mut envelopes = decode_stream(&stdout)?;
        let received = envelopes.len();

        // The daemon's lower bound is advisory; enforce the contract here.
        envelopes.retain(|e| e.timestamp > after);
        envelopes.sort_by_key(|e| e.timestamp);
        envelopes.truncate(limit);

        debug!(after, received, kept = envelopes.len(), "fetched feed batch");
        Ok(envelopes)
    }

    async fn reconnect(&self) -> Result<(), PubrewardError> {
        self.cli
            .run(&["whoami".to_string()])
            .await
            .map_err(|e| transient("reconnect failed", e))?;
        info!(program = %self.cli.program(), "feed client reachable again");
        Ok(())
    }
}
