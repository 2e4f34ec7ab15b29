// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed source trait.

use async_trait::async_trait;

use crate::error::PubrewardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::FeedEnvelope;

/// An ordered, resumable source of feed envelopes.
///
/// A fetch returns what is currently available. An empty result means
/// "caught up", not "feed ended": callers poll again later.
#[async_trait]
pub trait FeedSource: PluginAdapter {
    /// Returns up to `limit` envelopes with timestamp strictly greater than
    /// `after`, in ascending timestamp order.
    ///
    /// Read failures surface as [`PubrewardError::TransientSource`].
    async fn fetch_after(
        &self,
        after: i64,
        limit: usize,
    ) -> Result<Vec<FeedEnvelope>, PubrewardError>;

    /// Re-establishes the connection after a transient failure.
    async fn reconnect(&self) -> Result<(), PubrewardError>;
}
