// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the engine's external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod feed;
pub mod ledger;
pub mod publisher;
pub mod storage;

pub use adapter::PluginAdapter;
pub use feed::FeedSource;
pub use ledger::LedgerClient;
pub use publisher::Publisher;
pub use storage::StorageAdapter;
