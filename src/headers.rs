// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Headers Exchange Predicate
//!
//! Routes on the value/presence of fields in the message header table; the
//! routing key is not used. Binding arguments:
//!
//! - `x-match`: `all` does an AND match, `any` does an OR match.
//! - other fields prefixed with `x-` are ignored and logged.
//! - a field with no value or an empty value matches on presence only.
//! - a field with a value matches on presence and equal value.

use crate::{
    errors::ExchangeError,
    message::{value_to_string, HeaderValues},
};
use lapin::types::{AMQPValue, FieldTable};
use std::collections::BTreeMap;
use tracing::warn;

/// Binding argument selecting the match mode
pub const AMQP_HEADERS_MATCH: &str = "x-match";
/// `x-match` value for an AND match
pub const MATCH_ALL: &str = "all";
/// `x-match` value for an OR match
pub const MATCH_ANY: &str = "any";

/// How the criteria of a headers binding combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every criterion must hold (`x-match=all`)
    All,
    /// At least one criterion must hold (`x-match=any`)
    Any,
}

impl MatchMode {
    fn parse(value: &str) -> Result<MatchMode, ExchangeError> {
        match value {
            MATCH_ALL => Ok(MatchMode::All),
            MATCH_ANY => Ok(MatchMode::Any),
            other => Err(ExchangeError::InvalidMatchMode(other.to_owned())),
        }
    }

    /// The `x-match` value of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::All => MATCH_ALL,
            MatchMode::Any => MATCH_ANY,
        }
    }
}

/// Header criteria of a headers binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersPredicate {
    mode: MatchMode,
    criteria: BTreeMap<String, Option<String>>,
}

impl HeadersPredicate {
    /// Builds the predicate from `queue.bind` arguments.
    pub fn from_arguments(args: &FieldTable) -> Result<HeadersPredicate, ExchangeError> {
        let mut mode = None;
        let mut criteria = BTreeMap::new();

        for (key, value) in args.inner() {
            let key = key.as_str();

            if key.eq_ignore_ascii_case(AMQP_HEADERS_MATCH) {
                if mode.is_some() {
                    warn!(argument = key, "duplicate x-match argument in headers binding");
                    return Err(ExchangeError::DuplicateMatchMode);
                }
                mode = Some(MatchMode::parse(&value_to_string(value))?);
                continue;
            }

            if is_reserved(key) {
                warn!(argument = key, "ignoring unknown x- argument in headers binding");
                continue;
            }

            criteria.insert(key.to_owned(), expected_value(value));
        }

        HeadersPredicate::new(mode.ok_or(ExchangeError::MissingMatchMode)?, criteria)
    }

    /// Builds the predicate from the management form
    /// `<attribute1>=<value1>,<attribute2>=<value2>`. The mode defaults to
    /// `all` unless the text carries an `x-match` pair.
    pub fn from_text(text: &str) -> Result<HeadersPredicate, ExchangeError> {
        let mut mode = None;
        let mut criteria = BTreeMap::new();

        for entry in text.split(',') {
            let (key, value) = entry
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .ok_or_else(|| ExchangeError::MalformedBinding(entry.trim().to_owned()))?;

            if key.eq_ignore_ascii_case(AMQP_HEADERS_MATCH) {
                if mode.is_some() {
                    warn!(argument = key, "duplicate x-match pair in headers binding");
                    return Err(ExchangeError::DuplicateMatchMode);
                }
                mode = Some(MatchMode::parse(value)?);
                continue;
            }

            if is_reserved(key) {
                warn!(argument = key, "ignoring unknown x- argument in headers binding");
                continue;
            }

            criteria.insert(key.to_owned(), Some(value.to_owned()));
        }

        HeadersPredicate::new(mode.unwrap_or(MatchMode::All), criteria)
    }

    /// Creates a predicate from an already parsed mode and criteria.
    ///
    /// # Parameters
    /// * `mode` - How the criteria combine
    /// * `criteria` - Header name to expected value; `None` matches on presence
    ///
    /// # Returns
    /// The predicate, or `EmptyHeadersCriteria` when no criterion is given
    pub fn new(
        mode: MatchMode,
        criteria: BTreeMap<String, Option<String>>,
    ) -> Result<HeadersPredicate, ExchangeError> {
        if criteria.is_empty() {
            return Err(ExchangeError::EmptyHeadersCriteria);
        }

        Ok(HeadersPredicate { mode, criteria })
    }

    /// The match mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Header criteria, ordered by header name.
    pub fn criteria(&self) -> &BTreeMap<String, Option<String>> {
        &self.criteria
    }

    /// Evaluates the criteria against the message headers. Headers not named
    /// in the criteria never cause a rejection.
    pub fn matches(&self, headers: &HeaderValues) -> bool {
        let mut satisfied = self.criteria.iter().map(|(key, expected)| {
            match (headers.get(key), expected) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        });

        match self.mode {
            MatchMode::All => satisfied.all(|ok| ok),
            MatchMode::Any => satisfied.any(|ok| ok),
        }
    }

    /// Renders the criteria as `key=value` strings; presence-only criteria
    /// render with an empty value.
    pub fn mappings(&self) -> Vec<String> {
        self.criteria
            .iter()
            .map(|(key, value)| format!("{}={}", key, value.as_deref().unwrap_or_default()))
            .collect()
    }
}

fn is_reserved(key: &str) -> bool {
    key.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("x-"))
}

fn expected_value(value: &AMQPValue) -> Option<String> {
    Some(value_to_string(value)).filter(|v| !v.is_empty())
}
