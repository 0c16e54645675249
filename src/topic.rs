// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topic Binding Patterns
//!
//! Routing keys and patterns are dot-separated words. In a pattern `*` matches
//! exactly one word and `#` matches zero or more words.

use std::fmt;

/// Wildcard matching exactly one word
pub const SINGLE_WORD: &str = "*";
/// Wildcard matching zero or more words
pub const MULTI_WORD: &str = "#";

/// Binding key of a topic exchange, split into words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    words: Vec<String>,
}

impl TopicPattern {
    pub fn new(pattern: &str) -> TopicPattern {
        TopicPattern {
            raw: pattern.to_owned(),
            words: split_words(pattern).map(str::to_owned).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `routing_key` matches the pattern.
    ///
    /// # Parameters
    /// * `routing_key` - Dot-separated routing key of the message
    ///
    /// # Returns
    /// true when every word is matched by a literal or a wildcard
    pub fn matches(&self, routing_key: &str) -> bool {
        let key: Vec<&str> = split_words(routing_key).collect();
        let pattern: Vec<&str> = self.words.iter().map(String::as_str).collect();
        match_words(&pattern, &key)
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// An empty key or pattern has no words.
fn split_words(value: &str) -> impl Iterator<Item = &str> {
    value.split('.').filter(move |_| !value.is_empty())
}

/// Matches pattern words against key words with a rolling table over
/// (pattern index, key index): `next[j]` holds whether `pattern[i + 1..]`
/// matches `key[j..]`. Runs in O(|pattern| * |key|) regardless of how many
/// `#` the pattern holds.
fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    let mut next = vec![false; key.len() + 1];
    next[key.len()] = true;
    let mut current = vec![false; key.len() + 1];

    for word in pattern.iter().rev() {
        for j in (0..=key.len()).rev() {
            current[j] = if *word == MULTI_WORD {
                next[j] || (j < key.len() && current[j + 1])
            } else {
                j < key.len() && (*word == SINGLE_WORD || *word == key[j]) && next[j + 1]
            };
        }
        std::mem::swap(&mut next, &mut current);
    }

    next[0]
}
