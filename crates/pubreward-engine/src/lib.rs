// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed processing: word matching, per-batch aggregation, moderation, and
//! the driver loop that ties them to storage and the ledger.

pub mod aggregate;
pub mod driver;
pub mod moderation;
pub mod wordmatch;

pub use aggregate::{BatchAccumulator, BatchSummary, VoteKind, interpret_vote};
pub use driver::{BatchOutcome, FeedProcessor, Step, next_checkpoint};
pub use moderation::Moderator;
pub use wordmatch::WordMatcher;
