// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the pubreward feed engine.
//!
//! Defines the error type, domain types, and the adapter traits that front
//! the engine's external collaborators: local storage, the feed source,
//! the outbound publisher, and the payment-channel ledger.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CheckpointRegression, PubrewardError};
pub use types::{AdapterType, HealthStatus};

pub use traits::{FeedSource, LedgerClient, PluginAdapter, Publisher, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_display() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Storage,
            AdapterType::Feed,
            AdapterType::Ledger,
            AdapterType::Publisher,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_feed_source<T: FeedSource>() {}
        fn _assert_ledger_client<T: LedgerClient>() {}
        fn _assert_publisher<T: Publisher>() {}
    }
}
