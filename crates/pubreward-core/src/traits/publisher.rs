// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound feed publisher trait.

use async_trait::async_trait;

use crate::error::PubrewardError;
use crate::traits::adapter::PluginAdapter;

/// Publishes messages to the feed as the administering identity.
#[async_trait]
pub trait Publisher: PluginAdapter {
    /// Publishes a `contact` message about `target`.
    async fn publish_contact(
        &self,
        target: &str,
        following: bool,
        blocking: bool,
    ) -> Result<(), PubrewardError>;
}
