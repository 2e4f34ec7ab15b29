// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the pubreward feed engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and narrow typed
//! operations for the checkpoint, message index, tallies, profiles, and
//! moderation records.

pub mod adapter;
pub mod database;
pub mod filter;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
