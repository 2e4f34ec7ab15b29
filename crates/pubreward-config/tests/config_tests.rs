// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system.

use pubreward_config::diagnostic::ConfigError;
use pubreward_config::{load_and_validate_str, load_config_from_str, VoteRule};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[node]
identity = "@HZnU6wM+F17J0RSLXP05x3Lag2jGv3F3LzHMjh72coE=.ed25519"
log_level = "debug"

[feed]
sbotcli_path = "/usr/local/bin/sbotcli"
extra_args = ["--addr", "127.0.0.1:8008"]
batch_size = 200
scan_interval_secs = 5
vote_rule = "literal_like_only"

[storage]
database_path = "/tmp/pub.db"
wal_mode = false

[ledger]
enabled = true
host = "http://127.0.0.1:15001"
self_address = "0x0D0EFCcda4f079C0dD1B728297A43eE54d7170Cd"
token_address = "0x6601F810eaF2fa749EEa10533Fd4CC23B8C791dc"
min_balance_finney = 200
registration_bonus_finney = 20
max_poll_attempts = 3

[moderation]
wordlist_path = "/etc/pubreward/words.txt"
case_insensitive = false

[admin]
bind_address = "0.0.0.0"
port = 18080
workers = 4
queue_capacity = 16
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.node.log_level, "debug");
    assert_eq!(config.feed.extra_args, vec!["--addr", "127.0.0.1:8008"]);
    assert_eq!(config.feed.batch_size, 200);
    assert_eq!(config.feed.vote_rule, VoteRule::LiteralLikeOnly);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.ledger.min_balance(), 200 * 1_000_000_000_000_000u128);
    assert_eq!(config.ledger.registration_bonus(), 20 * 1_000_000_000_000_000u128);
    assert_eq!(config.ledger.max_poll_attempts, 3);
    assert!(!config.moderation.case_insensitive);
    assert_eq!(config.admin.port, 18080);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("defaults");
    assert_eq!(config.feed.batch_size, 500);
    assert_eq!(config.feed.scan_interval_secs, 15);
    assert_eq!(config.feed.vote_rule, VoteRule::NonUnlikeIsLike);
    assert_eq!(config.ledger.host, "http://127.0.0.1:15001");
    assert_eq!(config.ledger.settle_timeout, 100);
    assert_eq!(config.ledger.max_poll_attempts, 45);
    assert_eq!(config.admin.port, 18008);
    assert!(!config.ledger.enabled);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = "[feed]\nbach_size = 10\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "bach_size");
            assert_eq!(suggestion.as_deref(), Some("batch_size"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[feed]\nbatch_size = \"many\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn unknown_vote_rule_is_rejected() {
    assert!(load_and_validate_str("[feed]\nvote_rule = \"always_like\"\n").is_err());
}

#[test]
fn validation_errors_surface_through_loader() {
    let toml = "[ledger]\nenabled = true\nself_address = \"0x12\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors
        .iter()
        .all(|e| matches!(e, ConfigError::Validation { .. })));
    assert_eq!(errors.len(), 2, "self_address and token_address: {errors:?}");
}

#[test]
fn shipped_example_config_is_valid() {
    let toml = include_str!("../../../pubreward.example.toml");
    let config = load_and_validate_str(toml).expect("example config should validate");
    assert_eq!(config.feed.batch_size, 500);
    assert_eq!(config.feed.vote_rule, VoteRule::NonUnlikeIsLike);
    assert!(!config.ledger.enabled);
    assert_eq!(config.admin.port, 18008);
}
