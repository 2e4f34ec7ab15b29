// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./pubreward.toml` > `~/.config/pubreward/pubreward.toml`
//! > `/etc/pubreward/pubreward.toml` with environment variable overrides via
//! the `PUBREWARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PubrewardConfig;

/// Section names, longest first so `moderation_` never matches a shorter prefix.
const SECTIONS: &[&str] = &["moderation", "storage", "ledger", "admin", "feed", "node"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pubreward/pubreward.toml` (system-wide)
/// 3. `~/.config/pubreward/pubreward.toml` (user XDG config)
/// 4. `./pubreward.toml` (local directory)
/// 5. `PUBREWARD_*` environment variables
pub fn load_config() -> Result<PubrewardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PubrewardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PubrewardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PubrewardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PubrewardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PubrewardConfig::default()))
        .merge(Toml::file("/etc/pubreward/pubreward.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pubreward/pubreward.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pubreward.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `PUBREWARD_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `PUBREWARD_LEDGER_MIN_BALANCE_FINNEY` must become
/// `ledger.min_balance_finney`.
fn env_provider() -> Env {
    Env::prefixed("PUBREWARD_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(
            map_env_key("ledger_min_balance_finney"),
            "ledger.min_balance_finney"
        );
        assert_eq!(map_env_key("feed_batch_size"), "feed.batch_size");
        assert_eq!(map_env_key("node_identity"), "node.identity");
        assert_eq!(
            map_env_key("moderation_wordlist_path"),
            "moderation.wordlist_path"
        );
        assert_eq!(map_env_key("unknown"), "unknown");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("pubreward.toml", "[feed]\nbatch_size = 10\n")?;
            jail.set_env("PUBREWARD_FEED_BATCH_SIZE", "25");
            jail.set_env("PUBREWARD_LEDGER_HOST", "http://ledger:15001");
            let config = load_config_from_path(Path::new("pubreward.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.feed.batch_size, 25);
            assert_eq!(config.ledger.host, "http://ledger:15001");
            Ok(())
        });
    }
}
