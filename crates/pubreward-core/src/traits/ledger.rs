// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment-channel ledger client trait.

use async_trait::async_trait;

use crate::error::PubrewardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Channel, TokenAmount};

/// Client for the external payment-channel ledger.
///
/// Every call is a network round trip with a bounded timeout. Nothing is
/// cached: each read reflects the ledger's current view.
#[async_trait]
pub trait LedgerClient: PluginAdapter {
    /// Address of the node this client talks to.
    fn self_address(&self) -> &str;

    /// Returns the channel to `counterpart` for `token`, if one exists.
    async fn get_channel(
        &self,
        counterpart: &str,
        token: &str,
    ) -> Result<Option<Channel>, PubrewardError>;

    /// Opens a new channel to `counterpart` funded with `amount`.
    async fn open_channel(
        &self,
        counterpart: &str,
        token: &str,
        amount: TokenAmount,
        settle_timeout: u64,
    ) -> Result<(), PubrewardError>;

    /// Adds `amount` to the existing channel with `counterpart`.
    async fn deposit(
        &self,
        counterpart: &str,
        token: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError>;

    /// Sends `amount` of `token` to `target`.
    async fn transfer(
        &self,
        token: &str,
        amount: TokenAmount,
        target: &str,
        direct: bool,
        sync: bool,
    ) -> Result<(), PubrewardError>;
}
