// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment-channel ledger integration.
//!
//! [`PhotonClient`] talks to the ledger node over HTTP; [`ChannelReconciler`]
//! drives channel creation, funding, top-ups, and reward transfers on top of
//! any [`LedgerClient`](pubreward_core::LedgerClient).

pub mod client;
pub mod reconciler;

pub use client::PhotonClient;
pub use reconciler::{ChannelReconciler, EnsureOutcome, ReconcileAction, ReconcileReport};
