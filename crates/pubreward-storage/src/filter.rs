// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed, parameter-bound filters for list queries.
//!
//! Column names come only from `FilterColumn` implementations (static
//! strings). Caller-supplied values are always bound as parameters and
//! never appear in the SQL text.

use rusqlite::types::Value;

use pubreward_core::types::{DealTag, ViolationFilter};

/// A column that may appear in a WHERE clause.
pub trait FilterColumn: Copy {
    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationColumn {
    Plaintiff,
    Defendant,
    MessageKey,
    Reasons,
    DealTag,
}

impl FilterColumn for ViolationColumn {
    fn column(self) -> &'static str {
        match self {
            Self::Plaintiff => "plaintiff",
            Self::Defendant => "defendant",
            Self::MessageKey => "message_key",
            Self::Reasons => "reasons",
            Self::DealTag => "deal_tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveColumn {
    AuthorId,
    DealTag,
}

impl FilterColumn for SensitiveColumn {
    fn column(self) -> &'static str {
        match self {
            Self::AuthorId => "author_id",
            Self::DealTag => "deal_tag",
        }
    }
}

/// Accumulates equality predicates over columns of type `C`.
#[derive(Debug, Clone)]
pub struct QueryFilter<C: FilterColumn> {
    predicates: Vec<(C, Value)>,
}

impl<C: FilterColumn> Default for QueryFilter<C> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<C: FilterColumn> QueryFilter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column = value`.
    pub fn eq(mut self, column: C, value: impl Into<Value>) -> Self {
        self.predicates.push((column, value.into()));
        self
    }

    /// Adds `column = value` when `value` is present.
    pub fn eq_opt<V: Into<Value>>(self, column: C, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Renders ` WHERE a = ?1 AND b = ?2`, or an empty string.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .predicates
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{} = ?{}", col.column(), i + 1))
            .collect();
        format!(" WHERE {}", terms.join(" AND "))
    }

    /// Full statement text: `select` + WHERE clause + `suffix`.
    pub fn sql(&self, select: &str, suffix: &str) -> String {
        format!("{select}{}{suffix}", self.where_clause())
    }

    /// Bound parameter values, in placeholder order.
    pub fn params(&self) -> impl Iterator<Item = &Value> {
        self.predicates.iter().map(|(_, v)| v)
    }
}

fn tag_value(tag: DealTag) -> Value {
    Value::Text(tag.as_str().to_string())
}

impl From<&ViolationFilter> for QueryFilter<ViolationColumn> {
    fn from(f: &ViolationFilter) -> Self {
        QueryFilter::new()
            .eq_opt(ViolationColumn::Plaintiff, f.plaintiff.clone())
            .eq_opt(ViolationColumn::Defendant, f.defendant.clone())
            .eq_opt(ViolationColumn::MessageKey, f.message_key.clone())
            .eq_opt(ViolationColumn::Reasons, f.reasons.clone())
            .eq_opt(ViolationColumn::DealTag, f.deal_tag.map(tag_value))
    }
}

impl QueryFilter<SensitiveColumn> {
    pub fn by_tag(tag: Option<DealTag>) -> Self {
        QueryFilter::new().eq_opt(SensitiveColumn::DealTag, tag.map(tag_value))
    }
}
