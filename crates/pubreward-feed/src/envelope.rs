// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of the feed daemon's log stream into [`FeedEnvelope`]s.
//!
//! The stream is a sequence of concatenated JSON values, one per message:
//!
//! ```json
//! {"key":"%...sha256","value":{"author":"@...ed25519","timestamp":1.6e12,
//!  "content":{"type":"vote",...}},"timestamp":1.6e12}
//! ```
//!
//! `content` is kept as the raw JSON text so the classifier sees exactly the
//! bytes the author signed. Encrypted messages carry a string there.

use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::warn;

use pubreward_core::PubrewardError;
use pubreward_core::types::FeedEnvelope;

#[derive(Deserialize)]
struct WireEnvelope<'a> {
    key: String,
    #[serde(borrow)]
    value: WireValue<'a>,
    /// Receive time assigned by the local daemon.
    #[serde(default)]
    timestamp: Option<f64>,
}

#[derive(Deserialize)]
struct WireValue<'a> {
    author: String,
    /// Claimed by the author; used only when the receive time is missing.
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(borrow)]
    content: &'a RawValue,
}

/// Decodes every envelope in `bytes`.
///
/// Values that are valid JSON but not message-shaped are skipped with a
/// warning. Malformed JSON (usually a truncated read) fails the whole call
/// with [`PubrewardError::TransientSource`] so the caller refetches.
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<FeedEnvelope>, PubrewardError> {
    let stream = serde_json::Deserializer::from_slice(bytes).into_iter::<&RawValue>();
    let mut envelopes = Vec::new();

    for item in stream {
        let raw = item.map_err(|e| PubrewardError::TransientSource {
            message: format!("malformed feed stream: {e}"),
            source: Some(Box::new(e)),
        })?;

        match decode_one(raw.get()) {
            Some(env) => envelopes.push(env),
            None => warn!(value = %truncate(raw.get(), 80), "skipping non-message value"),
        }
    }

    Ok(envelopes)
}

fn decode_one(json: &str) -> Option<FeedEnvelope> {
    let wire: WireEnvelope<'_> = serde_json::from_str(json).ok()?;
    let ts = wire.timestamp.or(wire.value.timestamp)?;
    if !ts.is_finite() {
        return None;
    }
    Some(FeedEnvelope {
        key: wire.key,
        author: wire.value.author,
        timestamp: ts.trunc() as i64,
        content: wire.value.content.get().as_bytes().to_vec(),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOTE: &str = r#"{"key":"%v1.sha256","value":{"previous":null,"sequence":2,"author":"@bob.ed25519","timestamp":1600000000123.7,"hash":"sha256","content":{"type":"vote","vote":{"link":"%m1.sha256","value":1,"expression":"Like"}},"signature":"x"},"timestamp":1600000000555.25}"#;

    #[test]
    fn decodes_receive_time_and_raw_content() {
        let envs = decode_stream(VOTE.as_bytes()).unwrap();
        assert_eq!(envs.len(), 1);
        let env = &envs[0];
        assert_eq!(env.key, "%v1.sha256");
        assert_eq!(env.author, "@bob.ed25519");
        assert_eq!(env.timestamp, 1_600_000_000_555);
        assert!(env.content.starts_with(b"{\"type\":\"vote\""));
    }

    #[test]
    fn falls_back_to_claimed_timestamp() {
        let json = r#"{"key":"%a","value":{"author":"@a","timestamp":42.0,"content":"box"}}"#;
        let envs = decode_stream(json.as_bytes()).unwrap();
        assert_eq!(envs[0].timestamp, 42);
        assert_eq!(envs[0].content, b"\"box\"");
    }

    #[test]
    fn concatenated_values_with_whitespace() {
        let stream = format!("{VOTE}\n\n  {VOTE}\n");
        assert_eq!(decode_stream(stream.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn non_message_values_are_skipped() {
        let stream = format!("{{\"sync\":true}}\n{VOTE}\n[1,2,3]");
        let envs = decode_stream(stream.as_bytes()).unwrap();
        assert_eq!(envs.len(), 1);
    }

    #[test]
    fn truncated_stream_is_transient() {
        let stream = &VOTE[..VOTE.len() - 10];
        let err = decode_stream(stream.as_bytes()).unwrap_err();
        assert!(matches!(err, PubrewardError::TransientSource { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_stream_is_empty() {
        assert!(decode_stream(b"").unwrap().is_empty());
        assert!(decode_stream(b"   \n").unwrap().is_empty());
    }
}
