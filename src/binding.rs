// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Bindings and the Binding Registry
//!
//! A binding associates a kind-specific predicate with a destination queue.
//! Each exchange owns a `BindingRegistry`, an ordered copy-on-write list of
//! bindings: every mutation builds a new list and swaps it in atomically, so
//! routing iterates a consistent snapshot without ever blocking bind/unbind.

use crate::{headers::HeadersPredicate, message::HeaderValues, queue::QueueRef, topic::TopicPattern};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Matching rule of a binding, one variant per exchange kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingPredicate {
    Fanout,
    Direct(String),
    Topic(TopicPattern),
    Headers(HeadersPredicate),
}

impl BindingPredicate {
    /// Evaluates the predicate against a message's routing key and rendered
    /// header table.
    pub fn matches(&self, routing_key: &str, headers: &HeaderValues) -> bool {
        match self {
            BindingPredicate::Fanout => true,
            BindingPredicate::Direct(key) => key == routing_key,
            BindingPredicate::Topic(pattern) => pattern.matches(routing_key),
            BindingPredicate::Headers(predicate) => predicate.matches(headers),
        }
    }

    /// Renders the predicate as `key=value` strings for introspection.
    pub fn mappings(&self) -> Vec<String> {
        match self {
            BindingPredicate::Fanout => vec![],
            BindingPredicate::Direct(key) => vec![format!("routing-key={key}")],
            BindingPredicate::Topic(pattern) => vec![format!("routing-key={pattern}")],
            BindingPredicate::Headers(predicate) => predicate.mappings(),
        }
    }
}

/// A predicate paired with the queue it routes to.
#[derive(Debug, Clone)]
pub struct Binding {
    pub(crate) predicate: BindingPredicate,
    pub(crate) queue: QueueRef,
}

impl Binding {
    /// Creates a new binding.
    pub fn new(predicate: BindingPredicate, queue: QueueRef) -> Binding {
        Binding { predicate, queue }
    }

    pub fn predicate(&self) -> &BindingPredicate {
        &self.predicate
    }

    pub fn queue(&self) -> &QueueRef {
        &self.queue
    }
}

/// Immutable ordered view of the bindings at one point in time.
pub type BindingSnapshot = Arc<Vec<Binding>>;

/// Ordered collection of bindings with one binding per queue.
pub struct BindingRegistry {
    bindings: ArcSwap<Vec<Binding>>,
}

impl BindingRegistry {
    /// Creates an empty registry.
    pub fn new() -> BindingRegistry {
        BindingRegistry {
            bindings: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Inserts the binding, replacing in place any binding for the same queue.
    /// Returns `true` when an existing binding was replaced.
    pub fn add(&self, binding: Binding) -> bool {
        let previous = self.bindings.rcu(|current| {
            let mut next = Vec::clone(current);
            match next.iter_mut().find(|b| b.queue == binding.queue) {
                Some(existing) => *existing = binding.clone(),
                None => next.push(binding.clone()),
            }
            next
        });

        previous.iter().any(|b| b.queue == binding.queue)
    }

    /// Removes the binding for `queue`. Returns `false` when there was none.
    pub fn remove(&self, queue: &QueueRef) -> bool {
        let previous = self.bindings.rcu(|current| {
            current
                .iter()
                .filter(|b| &b.queue != queue)
                .cloned()
                .collect::<Vec<_>>()
        });

        previous.iter().any(|b| &b.queue == queue)
    }

    /// Drops every binding.
    pub fn clear(&self) {
        self.bindings.store(Arc::new(Vec::new()));
    }

    /// Consistent view of the bindings; later mutations are not visible
    /// through it.
    pub fn snapshot(&self) -> BindingSnapshot {
        self.bindings.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.load().len()
    }

    /// Whether `queue` has a binding.
    pub fn contains_queue(&self, queue: &QueueRef) -> bool {
        self.bindings.load().iter().any(|b| &b.queue == queue)
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
