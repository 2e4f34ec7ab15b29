// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use pubreward_core::types::{TokenAmount, FINNEY};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PubrewardConfig {
    /// Administering identity and logging.
    #[serde(default)]
    pub node: NodeConfig,

    /// Feed source and driver loop settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Payment-channel ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Moderation wordlist settings.
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Admin REST API settings.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Administering identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Feed identity of this pub (`@<base64>.ed25519`). Self-targeting
    /// moderation actions against it are refused. When unset, `serve`
    /// asks the feed daemon (`sbotcli whoami`) and refuses to start if
    /// that fails.
    #[serde(default)]
    pub identity: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// How vote expressions map onto likes and unlikes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRule {
    /// `"Unlike"` is an unlike; every other expression is a like.
    #[default]
    NonUnlikeIsLike,
    /// Only the literal `"Like"` and `"Unlike"` count; anything else is ignored.
    LiteralLikeOnly,
}

/// Feed source and driver loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Path to the feed daemon's command-line client.
    #[serde(default = "default_sbotcli_path")]
    pub sbotcli_path: String,

    /// Extra arguments passed before the subcommand (e.g. `--key`, `--addr`).
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Maximum envelopes fetched per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wait between polls once the feed is caught up.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Upper bound on one fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Wait before reconnecting after a transient source failure.
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,

    /// Vote interpretation.
    #[serde(default)]
    pub vote_rule: VoteRule,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sbotcli_path: default_sbotcli_path(),
            extra_args: Vec::new(),
            batch_size: default_batch_size(),
            scan_interval_secs: default_scan_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            vote_rule: VoteRule::default(),
        }
    }
}

impl FeedConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }
}

fn default_sbotcli_path() -> String {
    "sbotcli".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_scan_interval_secs() -> u64 {
    15
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_reconnect_backoff_secs() -> u64 {
    3
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("pubreward").join("pubreward.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("pubreward.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Payment-channel ledger configuration.
///
/// Amounts are configured in finney (1e15 of the smallest unit).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Run the channel reconciler and reward transfers.
    #[serde(default = "default_ledger_enabled")]
    pub enabled: bool,

    /// Base URL of the ledger node's HTTP API.
    #[serde(default = "default_ledger_host")]
    pub host: String,

    /// Address of the ledger node operated by this pub.
    #[serde(default)]
    pub self_address: String,

    /// Token every reward channel is denominated in.
    #[serde(default)]
    pub token_address: String,

    /// Settle timeout (in blocks) for newly opened channels.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout: u64,

    /// Balance floor each channel is topped up to.
    #[serde(default = "default_min_balance_finney")]
    pub min_balance_finney: u64,

    /// One-time bonus paid when a channel is created.
    #[serde(default = "default_registration_bonus_finney")]
    pub registration_bonus_finney: u64,

    /// Reward paid to the plaintiff of an upheld report.
    #[serde(default = "default_report_reward_finney")]
    pub report_reward_finney: u64,

    /// Interval between channel confirmation polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum confirmation polls before giving up.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Timeout applied to every ledger request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between counterparts during a sweep.
    #[serde(default = "default_sweep_delay_ms")]
    pub sweep_delay_ms: u64,

    /// Minimum time between two sweeps run by the driver loop.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: default_ledger_enabled(),
            host: default_ledger_host(),
            self_address: String::new(),
            token_address: String::new(),
            settle_timeout: default_settle_timeout(),
            min_balance_finney: default_min_balance_finney(),
            registration_bonus_finney: default_registration_bonus_finney(),
            report_reward_finney: default_report_reward_finney(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            sweep_delay_ms: default_sweep_delay_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl LedgerConfig {
    pub fn min_balance(&self) -> TokenAmount {
        TokenAmount::from(self.min_balance_finney) * FINNEY
    }

    pub fn registration_bonus(&self) -> TokenAmount {
        TokenAmount::from(self.registration_bonus_finney) * FINNEY
    }

    pub fn report_reward(&self) -> TokenAmount {
        TokenAmount::from(self.report_reward_finney) * FINNEY
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sweep_delay(&self) -> Duration {
        Duration::from_millis(self.sweep_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_ledger_enabled() -> bool {
    false
}

fn default_ledger_host() -> String {
    "http://127.0.0.1:15001".to_string()
}

fn default_settle_timeout() -> u64 {
    100
}

fn default_min_balance_finney() -> u64 {
    100
}

fn default_registration_bonus_finney() -> u64 {
    10
}

fn default_report_reward_finney() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_max_poll_attempts() -> u32 {
    45
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sweep_delay_ms() -> u64 {
    500
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Moderation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationConfig {
    /// Wordlist file, one term per line. `None` disables word matching.
    #[serde(default)]
    pub wordlist_path: Option<String>,

    /// Match terms regardless of letter case.
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            wordlist_path: None,
            case_insensitive: default_case_insensitive(),
        }
    }
}

fn default_case_insensitive() -> bool {
    true
}

/// Admin REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Serve the admin API alongside the driver loop.
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,

    /// Bind address for the admin API.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port for the admin API.
    #[serde(default = "default_admin_port")]
    pub port: u16,

    /// Background workers draining the task queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the background task queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
            bind_address: default_bind_address(),
            port: default_admin_port(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_admin_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_admin_port() -> u16 {
    18008
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}
