// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed adapters for the pubreward engine.
//!
//! Decodes the feed daemon's log stream into envelopes, classifies envelope
//! content into typed facts, and provides the `sbotcli`-backed
//! [`FeedSource`](pubreward_core::FeedSource) and
//! [`Publisher`](pubreward_core::Publisher) implementations.

mod cli;
pub mod classify;
pub mod envelope;
pub mod publisher;
pub mod source;

pub use classify::{classify, classify_content};
pub use envelope::decode_stream;
pub use publisher::SbotCliPublisher;
pub use source::SbotCliSource;
