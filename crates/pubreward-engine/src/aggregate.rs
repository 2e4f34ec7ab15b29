// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-batch aggregation.
//!
//! A [`BatchAccumulator`] is created for one batch, fed every new envelope
//! and its facts in feed order, then consumed by [`BatchAccumulator::finish`]
//! to produce the batch's [`BatchWrite`]. Nothing outlives the batch.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use pubreward_config::VoteRule;
use pubreward_core::types::{
    BatchWrite, Fact, FeedEnvelope, GivenLikeDelta, MessageRecord, ProfileRename,
    SensitiveWordRecord, TallyDelta,
};
use pubreward_core::{PubrewardError, StorageAdapter};

/// Direction of one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Like,
    Unlike,
}

/// Maps a vote expression onto a like, an unlike, or nothing.
pub fn interpret_vote(rule: VoteRule, expression: &str) -> Option<VoteKind> {
    match (rule, expression) {
        (_, "Unlike") => Some(VoteKind::Unlike),
        (VoteRule::NonUnlikeIsLike, _) => Some(VoteKind::Like),
        (VoteRule::LiteralLikeOnly, "Like") => Some(VoteKind::Like),
        (VoteRule::LiteralLikeOnly, _) => None,
    }
}

#[derive(Debug)]
struct Vote {
    link: String,
    voter: String,
    kind: VoteKind,
    time: i64,
}

/// Counters for one batch, logged by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub new_messages: usize,
    pub likes: usize,
    pub unlikes: usize,
    /// Votes ignored by the vote rule.
    pub ignored_votes: usize,
    /// Votes whose liked message has no known author.
    pub unresolved: usize,
    /// Links both liked and unliked in this batch with a net sum of zero.
    pub net_zero: usize,
    pub renames: usize,
    pub flagged: usize,
}

#[derive(Debug)]
pub struct BatchAccumulator {
    rule: VoteRule,
    seen: HashSet<String>,
    records: Vec<MessageRecord>,
    authors: HashMap<String, String>,
    votes: Vec<Vote>,
    ignored_votes: usize,
    renames: Vec<ProfileRename>,
    sensitive: Vec<SensitiveWordRecord>,
}

impl BatchAccumulator {
    pub fn new(rule: VoteRule) -> Self {
        Self {
            rule,
            seen: HashSet::new(),
            records: Vec::new(),
            authors: HashMap::new(),
            votes: Vec::new(),
            ignored_votes: 0,
            renames: Vec::new(),
            sensitive: Vec::new(),
        }
    }

    /// Records one new envelope and its facts.
    ///
    /// Returns `false`, ignoring the envelope, when its key was already
    /// observed in this batch.
    pub fn observe(&mut self, envelope: &FeedEnvelope, facts: &[Fact]) -> bool {
        if !self.seen.insert(envelope.key.clone()) {
            return false;
        }
        self.records.push(MessageRecord::from(envelope));
        self.authors
            .insert(envelope.key.clone(), envelope.author.clone());

        for fact in facts {
            match fact {
                Fact::Vote { link, expression } => match interpret_vote(self.rule, expression) {
                    Some(kind) => self.votes.push(Vote {
                        link: link.clone(),
                        voter: envelope.author.clone(),
                        kind,
                        time: envelope.timestamp,
                    }),
                    None => self.ignored_votes += 1,
                },
                Fact::Rename { subject, name } => self.renames.push(ProfileRename {
                    subject: subject.clone(),
                    name: name.clone(),
                    time: envelope.timestamp,
                }),
                Fact::ContactEdge { .. } | Fact::Post { .. } => {}
            }
        }
        true
    }

    /// Adds a moderation record produced for this batch.
    pub fn flag(&mut self, record: SensitiveWordRecord) {
        self.sensitive.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolves liked-message authors and builds the batch write.
    ///
    /// Authors come from this batch first, then from stored records. Likes
    /// are ordered before unlikes. Counted votes are also summed per voter.
    /// Renames collapse to the last one per subject in feed order.
    pub async fn finish(
        self,
        store: &dyn StorageAdapter,
    ) -> Result<(BatchWrite, BatchSummary), PubrewardError> {
        let mut summary = BatchSummary {
            new_messages: self.records.len(),
            ignored_votes: self.ignored_votes,
            flagged: self.sensitive.len(),
            ..Default::default()
        };

        let mut resolved: HashMap<String, Option<String>> = HashMap::new();
        let mut likes = Vec::new();
        let mut unlikes = Vec::new();
        let mut net: HashMap<&str, (i64, bool, bool)> = HashMap::new();
        let mut given: Vec<GivenLikeDelta> = Vec::new();
        let mut given_index: HashMap<&str, usize> = HashMap::new();

        for vote in &self.votes {
            let author = match resolved.get(&vote.link) {
                Some(cached) => cached.clone(),
                None => {
                    let found = match self.authors.get(&vote.link) {
                        Some(a) => Some(a.clone()),
                        None => store.message_author(&vote.link).await?,
                    };
                    resolved.insert(vote.link.clone(), found.clone());
                    found
                }
            };
            let Some(author_id) = author else {
                debug!(link = %vote.link, "liked message author unknown, skipping vote");
                summary.unresolved += 1;
                continue;
            };

            let entry = net.entry(vote.link.as_str()).or_default();
            let delta = match vote.kind {
                VoteKind::Like => {
                    summary.likes += 1;
                    entry.1 = true;
                    1
                }
                VoteKind::Unlike => {
                    summary.unlikes += 1;
                    entry.2 = true;
                    -1
                }
            };
            entry.0 += delta;

            let slot = *given_index.entry(vote.voter.as_str()).or_insert_with(|| {
                given.push(GivenLikeDelta {
                    voter_id: vote.voter.clone(),
                    delta: 0,
                    time: vote.time,
                });
                given.len() - 1
            });
            given[slot].delta += delta;
            given[slot].time = given[slot].time.max(vote.time);

            let delta = TallyDelta {
                message_key: vote.link.clone(),
                author_id,
                delta,
                time: vote.time,
            };
            match vote.kind {
                VoteKind::Like => likes.push(delta),
                VoteKind::Unlike => unlikes.push(delta),
            }
        }

        summary.net_zero = net
            .values()
            .filter(|(sum, liked, unliked)| *liked && *unliked && *sum == 0)
            .count();

        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, ProfileRename> = HashMap::new();
        for rename in self.renames {
            if !latest.contains_key(&rename.subject) {
                order.push(rename.subject.clone());
            }
            latest.insert(rename.subject.clone(), rename);
        }
        let renames: Vec<ProfileRename> = order
            .into_iter()
            .filter_map(|subject| latest.remove(&subject))
            .collect();
        summary.renames = renames.len();

        likes.extend(unlikes);
        let write = BatchWrite {
            records: self.records,
            tally_deltas: likes,
            given_deltas: given,
            renames,
            sensitive: self.sensitive,
        };
        Ok((write, summary))
    }
}
