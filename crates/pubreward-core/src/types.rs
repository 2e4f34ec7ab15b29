// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the feed, storage, engine, and ledger crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PubrewardError;

/// Token amount in the ledger's smallest unit.
pub type TokenAmount = u128;

/// One finney (1e15 of the smallest unit).
pub const FINNEY: TokenAmount = 1_000_000_000_000_000;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Feed,
    Ledger,
    Publisher,
}

// --- Feed ---

/// A single message as delivered by the feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEnvelope {
    /// Content-addressed message key.
    pub key: String,
    /// Identity that signed the message.
    pub author: String,
    /// Receive time in milliseconds since the epoch.
    pub timestamp: i64,
    /// Raw content bytes, usually a JSON object.
    pub content: Vec<u8>,
}

/// A typed fact extracted from one envelope.
///
/// A single envelope may yield several facts, or none at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Vote {
        link: String,
        expression: String,
    },
    Rename {
        subject: String,
        name: String,
    },
    ContactEdge {
        target: String,
        following: bool,
        blocking: bool,
        via_pub: bool,
    },
    Post {
        text: String,
        thread_root: Option<String>,
    },
}

/// Outcome of classifying one envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub facts: Vec<Fact>,
}

impl Classified {
    /// No schema matched the content.
    pub fn is_unrecognized(&self) -> bool {
        self.facts.is_empty()
    }
}

// --- Persisted entities ---

/// Write-once index entry mapping a message key to its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_key: String,
    pub author_id: String,
    pub timestamp: i64,
}

impl From<&FeedEnvelope> for MessageRecord {
    fn from(env: &FeedEnvelope) -> Self {
        Self {
            message_key: env.key.clone(),
            author_id: env.author.clone(),
            timestamp: env.timestamp,
        }
    }
}

/// A signed change to the tally of one liked message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyDelta {
    pub message_key: String,
    /// Author of the liked message (not the voter).
    pub author_id: String,
    pub delta: i64,
    pub time: i64,
}

/// A signed change to the likes one identity has given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivenLikeDelta {
    pub voter_id: String,
    pub delta: i64,
    pub time: i64,
}

/// Persisted net tally for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeTally {
    pub message_key: String,
    pub author_id: String,
    pub like_sum: i64,
    pub last_update_time: i64,
}

/// Net likes attributed to one identity, joined with its profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeSum {
    pub client_id: String,
    pub display_name: Option<String>,
    pub ledger_address: Option<String>,
    pub like_count: i64,
}

/// Identity profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub client_id: String,
    pub display_name: Option<String>,
    pub ledger_address: Option<String>,
    pub bio: Option<String>,
}

/// A display-name binding observed in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRename {
    pub subject: String,
    pub name: String,
    pub time: i64,
}

/// Resolution state of a moderation record.
///
/// Older clients send the numeric codes `"0"`, `"1"`, `"2"`, which are
/// accepted as aliases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DealTag {
    #[strum(to_string = "pending", serialize = "0")]
    #[serde(alias = "0")]
    Pending,
    #[strum(to_string = "upheld", serialize = "1")]
    #[serde(alias = "1")]
    Upheld,
    #[strum(to_string = "dismissed", serialize = "2")]
    #[serde(alias = "2")]
    Dismissed,
}

impl DealTag {
    /// Column value stored in SQLite.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Upheld => "upheld",
            Self::Dismissed => "dismissed",
        }
    }
}

/// A report filed by one identity against another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub plaintiff: String,
    pub defendant: String,
    pub message_key: String,
    pub reasons: String,
    pub deal_tag: DealTag,
    pub record_time: i64,
    pub deal_time: Option<i64>,
    pub reward_note: Option<String>,
}

/// Resolution applied to the open violation for one triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationUpdate {
    pub plaintiff: String,
    pub defendant: String,
    pub message_key: String,
    pub deal_tag: DealTag,
    pub deal_time: i64,
    pub reward_note: Option<String>,
}

/// Evidence that a post matched the moderation wordlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveWordRecord {
    pub reporter_pub_id: String,
    pub time: i64,
    pub flagged_text: String,
    pub message_key: String,
    pub author_id: String,
    pub deal_tag: DealTag,
    pub deal_time: Option<i64>,
}

/// Optional filters for listing violation records.
///
/// Every populated field becomes one bound equality predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationFilter {
    #[serde(default)]
    pub plaintiff: Option<String>,
    #[serde(default)]
    pub defendant: Option<String>,
    #[serde(default)]
    pub message_key: Option<String>,
    #[serde(default)]
    pub reasons: Option<String>,
    #[serde(default)]
    pub deal_tag: Option<DealTag>,
}

/// Kind of a collected user task.
///
/// Older clients send the numeric codes `"1"` and `"4"`, which are accepted
/// as aliases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[strum(to_string = "login", serialize = "1")]
    #[serde(alias = "1")]
    Login,
    #[strum(to_string = "nft_created", serialize = "4")]
    #[serde(alias = "4")]
    NftCreated,
}

impl TaskKind {
    /// Column value stored in SQLite.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::NftCreated => "nft_created",
        }
    }
}

/// A task an identity completed, as notified by a client app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTask {
    /// Pub that collected the task.
    pub pub_id: String,
    pub client_id: String,
    pub kind: TaskKind,
    pub time: i64,
    #[serde(default)]
    pub nft_tx_hash: Option<String>,
    #[serde(default)]
    pub nft_token_id: Option<String>,
    #[serde(default)]
    pub nft_store_url: Option<String>,
}

/// Selects the tasks of one identity. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTaskFilter {
    pub client_id: String,
    #[serde(default)]
    pub kind: Option<TaskKind>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

/// Row counts reported by `pubreward status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub messages: u64,
    pub tallies: u64,
    pub profiles: u64,
    pub registered: u64,
    pub open_violations: u64,
    pub pending_sensitive: u64,
    pub blacklisted: u64,
}

// --- Batches ---

/// Everything one batch persists, applied in a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWrite {
    pub records: Vec<MessageRecord>,
    /// Ordered: all +1 deltas precede all -1 deltas.
    pub tally_deltas: Vec<TallyDelta>,
    /// One entry per voter.
    pub given_deltas: Vec<GivenLikeDelta>,
    pub renames: Vec<ProfileRename>,
    pub sensitive: Vec<SensitiveWordRecord>,
}

impl BatchWrite {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
            && self.tally_deltas.is_empty()
            && self.given_deltas.is_empty()
            && self.renames.is_empty()
            && self.sensitive.is_empty()
    }
}

/// Row-level outcome of [`BatchWrite`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCommit {
    pub records_inserted: usize,
    pub tallies_applied: usize,
    pub given_applied: usize,
    pub renames_applied: usize,
    pub sensitive_inserted: usize,
}

// --- Moderation ---

/// Derived moderation state of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Clear,
    Flagged,
    Blocked,
}

/// Outbound contact message requested by moderation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAction {
    pub target: String,
    pub unfollow: bool,
    pub block: bool,
}

impl ContactAction {
    /// Unfollow and block `target`.
    pub fn block(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            unfollow: true,
            block: true,
        }
    }
}

// --- Ledger ---

/// A payment channel as reported by the ledger. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub channel_identifier: String,
    pub partner_address: String,
    pub balance: TokenAmount,
    pub token_address: String,
    #[serde(default)]
    pub settle_timeout: u64,
    #[serde(default)]
    pub state: i32,
}

/// Validates a ledger address: `0x` followed by 40 hex digits.
pub fn validate_ledger_address(address: &str) -> Result<(), PubrewardError> {
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| PubrewardError::InvalidInput(format!("address {address} lacks 0x prefix")))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PubrewardError::InvalidInput(format!(
            "address {address} is not 20 hex-encoded bytes"
        )));
    }
    Ok(())
}
