// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for pubreward integration tests.
//!
//! Provides in-memory adapters and fixtures for fast, deterministic tests
//! without a feed daemon or a ledger node.
//!
//! # Components
//!
//! - [`MemoryFeed`] - Feed source over an in-memory envelope list
//! - [`ScriptedLedger`] - Ledger with call recording and scripted failures
//! - [`RecordingPublisher`] - Publisher that captures contact messages
//! - [`FailingStore`] - Storage wrapper with injectable write failures
//! - [`fixtures`] - Envelope builders and temp SQLite stores

pub mod failing_store;
pub mod fixtures;
pub mod memory_feed;
pub mod recording_publisher;
pub mod scripted_ledger;

pub use failing_store::FailingStore;
pub use memory_feed::MemoryFeed;
pub use recording_publisher::{PublishedContact, RecordingPublisher};
pub use scripted_ledger::{LedgerCall, ScriptedLedger};
