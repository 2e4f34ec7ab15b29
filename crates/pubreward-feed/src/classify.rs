// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content classifier.
//!
//! Content is only treated as structured when its first non-whitespace byte
//! is `{`. Each schema is then tried on its own; a mismatch in one schema
//! never affects the others, and none of them can fail the batch.
//!
//! Votes and renames are recognized by shape whatever `type` says, so one
//! object can yield both. Contacts and posts also need the matching `type`,
//! since their fields are too generic to identify them alone.

use serde::Deserialize;
use tracing::trace;

use pubreward_core::types::{Classified, Fact, FeedEnvelope};

#[derive(Deserialize)]
struct Typed {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct VoteContent {
    vote: VoteBody,
}

#[derive(Deserialize)]
struct VoteBody {
    link: String,
    #[serde(default)]
    expression: String,
}

#[derive(Deserialize)]
struct AboutContent {
    about: String,
    name: String,
}

#[derive(Deserialize)]
struct ContactContent {
    contact: String,
    #[serde(default)]
    following: bool,
    #[serde(default)]
    blocking: bool,
    #[serde(rename = "pub", default)]
    via_pub: bool,
}

#[derive(Deserialize)]
struct PostContent {
    #[serde(default)]
    text: String,
    #[serde(default)]
    root: Option<String>,
}

/// Classifies one envelope.
pub fn classify(envelope: &FeedEnvelope) -> Classified {
    classify_content(&envelope.content)
}

/// Classifies raw content bytes.
pub fn classify_content(content: &[u8]) -> Classified {
    let first = content.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return Classified::default();
    }

    let kind = serde_json::from_slice::<Typed>(content)
        .ok()
        .and_then(|t| t.kind)
        .unwrap_or_default();

    let mut facts = Vec::new();
    facts.extend(vote(content));
    facts.extend(rename(content));
    facts.extend(contact(&kind, content));
    facts.extend(post(&kind, content));
    Classified { facts }
}

fn parse<'a, T: Deserialize<'a>>(schema: &str, content: &'a [u8]) -> Option<T> {
    match serde_json::from_slice(content) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(schema, error = %e, "schema mismatch");
            None
        }
    }
}

fn vote(content: &[u8]) -> Option<Fact> {
    let v: VoteContent = parse("vote", content)?;
    Some(Fact::Vote {
        link: v.vote.link,
        expression: v.vote.expression,
    })
}

fn rename(content: &[u8]) -> Option<Fact> {
    let a: AboutContent = parse("about", content)?;
    if a.name.is_empty() {
        return None;
    }
    Some(Fact::Rename {
        subject: a.about,
        name: a.name,
    })
}

fn contact(kind: &str, content: &[u8]) -> Option<Fact> {
    if kind != "contact" {
        return None;
    }
    let c: ContactContent = parse("contact", content)?;
    Some(Fact::ContactEdge {
        target: c.contact,
        following: c.following,
        blocking: c.blocking,
        via_pub: c.via_pub,
    })
}

fn post(kind: &str, content: &[u8]) -> Option<Fact> {
    if kind != "post" {
        return None;
    }
    let p: PostContent = parse("post", content)?;
    Some(Fact::Post {
        text: p.text,
        thread_root: p.root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn facts(json: &str) -> Vec<Fact> {
        classify_content(json.as_bytes()).facts
    }

    #[test]
    fn vote_yields_link_and_expression() {
        let f = facts(r#"{"type":"vote","vote":{"link":"%m1","value":1,"expression":"Yup"}}"#);
        assert_eq!(
            f,
            vec![Fact::Vote {
                link: "%m1".into(),
                expression: "Yup".into()
            }]
        );
    }

    #[test]
    fn about_requires_a_name() {
        assert_eq!(
            facts(r#"{"type":"about","about":"@alice","name":"Alice"}"#),
            vec![Fact::Rename {
                subject: "@alice".into(),
                name: "Alice".into()
            }]
        );
        assert!(facts(r#"{"type":"about","about":"@alice","image":"&blob"}"#).is_empty());
        assert!(facts(r#"{"type":"about","about":"@alice","name":""}"#).is_empty());
    }

    #[test]
    fn contact_reads_pub_flag() {
        let f = facts(r#"{"type":"contact","contact":"@eve","following":true,"pub":true}"#);
        assert_eq!(
            f,
            vec![Fact::ContactEdge {
                target: "@eve".into(),
                following: true,
                blocking: false,
                via_pub: true
            }]
        );
    }

    #[test]
    fn post_keeps_thread_root() {
        let f = facts(r#"{"type":"post","text":"hello","root":"%thread"}"#);
        assert_eq!(
            f,
            vec![Fact::Post {
                text: "hello".into(),
                thread_root: Some("%thread".into())
            }]
        );
    }

    #[test]
    fn leading_whitespace_is_allowed() {
        assert_eq!(facts("  \n {\"type\":\"post\",\"text\":\"x\"}").len(), 1);
    }

    #[test]
    fn non_object_content_is_unrecognized() {
        assert!(classify_content(b"\"boxed.private\"").is_unrecognized());
        assert!(classify_content(b"[1,2]").is_unrecognized());
        assert!(classify_content(b"").is_unrecognized());
        assert!(classify_content(b"{not json").is_unrecognized());
    }

    #[test]
    fn schema_mismatch_is_ignored() {
        assert!(facts(r#"{"type":"vote","vote":"nope"}"#).is_empty());
        assert!(facts(r#"{"type":"contact","following":true}"#).is_empty());
        assert!(facts(r#"{"type":"gathering","title":"x"}"#).is_empty());
        assert!(facts(r#"{"text":"no type"}"#).is_empty());
        assert!(matches!(
            facts(r#"{"type":"post","contact":"@eve","following":true}"#).as_slice(),
            [Fact::Post { .. }]
        ));
    }

    #[test]
    fn vote_and_about_in_one_object_yield_both() {
        let f = facts(
            r#"{"type":"about","about":"@alice","name":"Alice","vote":{"link":"%m1","expression":"Like"}}"#,
        );
        assert_eq!(
            f,
            vec![
                Fact::Vote {
                    link: "%m1".into(),
                    expression: "Like".into()
                },
                Fact::Rename {
                    subject: "@alice".into(),
                    name: "Alice".into()
                },
            ]
        );
    }

    #[test]
    fn vote_and_about_need_no_type() {
        assert_eq!(facts(r#"{"vote":{"link":"%m1"}}"#).len(), 1);
        assert_eq!(facts(r#"{"type":7,"about":"@bob","name":"Bob"}"#).len(), 1);
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = classify_content(&bytes);
        }
    }
}
