// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. All errors are collected; validation does not fail fast.

use pubreward_core::types::validate_ledger_address;

use crate::diagnostic::ConfigError;
use crate::model::PubrewardConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &PubrewardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(identity) = &config.node.identity
        && !looks_like_feed_id(identity)
    {
        errors.push(ConfigError::validation(format!(
            "node.identity `{identity}` is not a feed identity (expected @<base64>.ed25519)"
        )));
    }

    if config.feed.sbotcli_path.trim().is_empty() {
        errors.push(ConfigError::validation("feed.sbotcli_path must not be empty"));
    }
    if config.feed.batch_size == 0 {
        errors.push(ConfigError::validation("feed.batch_size must be at least 1"));
    }
    if config.feed.fetch_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "feed.fetch_timeout_secs must be at least 1",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    let ledger = &config.ledger;
    if ledger.enabled {
        for (key, value) in [
            ("ledger.self_address", &ledger.self_address),
            ("ledger.token_address", &ledger.token_address),
        ] {
            if let Err(e) = validate_ledger_address(value) {
                errors.push(ConfigError::validation(format!("{key}: {e}")));
            }
        }
        if !(ledger.host.starts_with("http://") || ledger.host.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "ledger.host `{}` must be an http(s) URL",
                ledger.host
            )));
        }
    }
    if ledger.max_poll_attempts == 0 {
        errors.push(ConfigError::validation(
            "ledger.max_poll_attempts must be at least 1",
        ));
    }
    if ledger.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "ledger.request_timeout_secs must be at least 1",
        ));
    }

    let admin = &config.admin;
    if admin.bind_address.parse::<std::net::IpAddr>().is_err() {
        errors.push(ConfigError::validation(format!(
            "admin.bind_address `{}` is not a valid IP address",
            admin.bind_address
        )));
    }
    if admin.workers == 0 {
        errors.push(ConfigError::validation("admin.workers must be at least 1"));
    }
    if admin.queue_capacity == 0 {
        errors.push(ConfigError::validation(
            "admin.queue_capacity must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn looks_like_feed_id(id: &str) -> bool {
    id.strip_prefix('@')
        .and_then(|rest| rest.strip_suffix(".ed25519"))
        .is_some_and(|key| !key.is_empty())
}
