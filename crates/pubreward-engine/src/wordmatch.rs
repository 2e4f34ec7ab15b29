// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-term matcher for the moderation wordlist.
//!
//! Terms are escaped and joined into a single alternation, compiled once.
//! The regex engine runs literal alternations through a multi-pattern
//! prefilter, so a lookup is a single pass over the text.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::info;

use pubreward_core::PubrewardError;

/// Compiled wordlist. An empty list never matches.
#[derive(Debug, Clone, Default)]
pub struct WordMatcher {
    regex: Option<Regex>,
    terms: usize,
}

impl WordMatcher {
    /// A matcher with no terms.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<I, S>(terms: I, case_insensitive: bool) -> Result<Self, PubrewardError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(&t))
            .collect();

        if escaped.is_empty() {
            return Ok(Self::empty());
        }

        let regex = RegexBuilder::new(&escaped.join("|"))
            .case_insensitive(case_insensitive)
            .size_limit(64 * (1 << 20))
            .build()
            .map_err(|e| PubrewardError::Config(format!("wordlist does not compile: {e}")))?;

        Ok(Self {
            regex: Some(regex),
            terms: escaped.len(),
        })
    }

    /// Parses a wordlist: one term per line, `#` comments and blank lines ignored.
    pub fn parse(list: &str, case_insensitive: bool) -> Result<Self, PubrewardError> {
        let terms = list
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        Self::new(terms, case_insensitive)
    }

    pub fn from_file(path: &Path, case_insensitive: bool) -> Result<Self, PubrewardError> {
        let list = std::fs::read_to_string(path).map_err(|e| {
            PubrewardError::Config(format!("cannot read wordlist {}: {e}", path.display()))
        })?;
        let matcher = Self::parse(&list, case_insensitive)?;
        info!(path = %path.display(), terms = matcher.terms, "wordlist loaded");
        Ok(matcher)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// First matching term occurrence, as it appears in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.as_ref()?.find(text).map(|m| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms == 0
    }
}
