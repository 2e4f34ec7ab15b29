// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the pubreward feed engine.

use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum PubrewardError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The feed source could not be read. The driver reconnects and retries.
    #[error("feed source error: {message}")]
    TransientSource {
        message: String,
        source: Option<BoxedError>,
    },

    /// Local persistence failed. The current batch is aborted without
    /// advancing the checkpoint.
    #[error("persistence error: {source}")]
    Persistence { source: BoxedError },

    /// A payment-channel ledger call failed.
    #[error("ledger error: {message}")]
    Ledger {
        message: String,
        source: Option<BoxedError>,
    },

    /// A newly opened channel did not show up on the ledger in time.
    #[error("channel to {counterpart} not confirmed after {attempts} polls")]
    ChannelTimeout { counterpart: String, attempts: u32 },

    /// A moderation action targeted the administering identity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Caller supplied a malformed value (address, tag, identifier).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An open record with the same identity already exists.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Outbound publish to the feed failed.
    #[error("publish error: {message}")]
    Publish {
        message: String,
        source: Option<BoxedError>,
    },

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bounded queue refused new work.
    #[error("busy: {0}")]
    Busy(String),

    /// Shutdown was requested while the operation was in flight.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PubrewardError {
    /// Wraps any error as a persistence failure.
    pub fn persistence(source: impl Into<BoxedError>) -> Self {
        Self::Persistence {
            source: source.into(),
        }
    }

    /// Builds the error returned when a checkpoint would move backwards.
    pub fn checkpoint_regression(stored: i64, attempted: i64) -> Self {
        Self::Persistence {
            source: Box::new(CheckpointRegression { stored, attempted }),
        }
    }

    /// Whether the next loop iteration or sweep may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientSource { .. }
                | Self::Persistence { .. }
                | Self::Ledger { .. }
                | Self::ChannelTimeout { .. }
                | Self::Timeout { .. }
                | Self::Busy(_)
        )
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::TransientSource { .. } => "feed_source",
            Self::Persistence { .. } => "persistence",
            Self::Ledger { .. } => "ledger",
            Self::ChannelTimeout { .. } => "channel_timeout",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidInput(_) => "invalid_input",
            Self::Duplicate(_) => "duplicate",
            Self::Publish { .. } => "publish",
            Self::NotFound(_) => "not_found",
            Self::Busy(_) => "busy",
            Self::Cancelled(_) => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

/// Attempted to move the checkpoint below its stored value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("checkpoint regression: stored {stored}, attempted {attempted}")]
pub struct CheckpointRegression {
    pub stored: i64,
    pub attempted: i64,
}
