// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the payment-channel node's REST API.
//!
//! Provides [`PhotonClient`], which implements [`LedgerClient`] over the
//! node's `/api/1` endpoints. Every request carries the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use pubreward_config::model::LedgerConfig;
use pubreward_core::types::{AdapterType, Channel, HealthStatus, TokenAmount};
use pubreward_core::{LedgerClient, PluginAdapter, PubrewardError};

#[derive(Debug, Serialize)]
struct DepositPayload<'a> {
    partner_address: &'a str,
    token_address: &'a str,
    balance: TokenAmount,
    settle_timeout: u64,
    new_channel: bool,
}

#[derive(Debug, Serialize)]
struct TransferPayload {
    amount: TokenAmount,
    is_direct: bool,
    secret: &'static str,
    sync: bool,
    data: &'static str,
}

/// Client for one ledger node.
#[derive(Debug, Clone)]
pub struct PhotonClient {
    client: reqwest::Client,
    base_url: String,
    self_address: String,
    timeout: Duration,
}

impl PhotonClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, PubrewardError> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PubrewardError::Ledger {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            self_address: config.self_address.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send_error(&self, what: &str, e: reqwest::Error) -> PubrewardError {
        if e.is_timeout() {
            PubrewardError::Timeout {
                duration: self.timeout,
            }
        } else {
            PubrewardError::Ledger {
                message: format!("{what} request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }

    /// Sends `request` and fails on any non-2xx status.
    async fn execute(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PubrewardError> {
        let response = request.send().await.map_err(|e| self.send_error(what, e))?;
        let status = response.status();
        debug!(status = %status, what, "ledger response received");

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PubrewardError::Ledger {
            message: format!("{what} returned {status}: {}", body.trim()),
            source: None,
        })
    }

    async fn put_deposit(&self, what: &str, payload: &DepositPayload<'_>) -> Result<(), PubrewardError> {
        let request = self.client.put(self.url("/api/1/deposit")).json(payload);
        self.execute(what, request).await?;
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for PhotonClient {
    fn name(&self) -> &str {
        "photon"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        let request = self.client.get(self.url("/api/1/channels"));
        match self.execute("health", request).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for PhotonClient {
    fn self_address(&self) -> &str {
        &self.self_address
    }

    async fn get_channel(
        &self,
        counterpart: &str,
        token: &str,
    ) -> Result<Option<Channel>, PubrewardError> {
        let request = self.client.get(self.url("/api/1/channels"));
        let response = self.execute("list channels", request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.send_error("list channels", e))?;

        // The node answers `null` rather than `[]` when it has no channels.
        let channels: Option<Vec<Channel>> =
            serde_json::from_str(&body).map_err(|e| PubrewardError::Ledger {
                message: format!("failed to parse channel list: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(channels.unwrap_or_default().into_iter().find(|ch| {
            ch.partner_address.eq_ignore_ascii_case(counterpart)
                && ch.token_address.eq_ignore_ascii_case(token)
        }))
    }

    async fn open_channel(
        &self,
        counterpart: &str,
        token: &str,
        amount: TokenAmount,
        settle_timeout: u64,
    ) -> Result<(), PubrewardError> {
        let payload = DepositPayload {
            partner_address: counterpart,
            token_address: token,
            balance: amount,
            settle_timeout,
            new_channel: true,
        };
        self.put_deposit("open channel", &payload).await
    }

    async fn deposit(
        &self,
        counterpart: &str,
        token: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError> {
        let payload = DepositPayload {
            partner_address: counterpart,
            token_address: token,
            balance: amount,
            settle_timeout: 0,
            new_channel: false,
        };
        self.put_deposit("deposit", &payload).await
    }

    async fn transfer(
        &self,
        token: &str,
        amount: TokenAmount,
        target: &str,
        direct: bool,
        sync: bool,
    ) -> Result<(), PubrewardError> {
        let payload = TransferPayload {
            amount,
            is_direct: direct,
            secret: "",
            sync,
            data: "",
        };
        let request = self
            .client
            .post(self.url(&format!("/api/1/transfers/{token}/{target}")))
            .json(&payload);
        self.execute("transfer", request).await?;
        Ok(())
    }
}
