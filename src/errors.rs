// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Exchange Layer
//!
//! This module provides the error types returned by bind, unbind and route
//! operations. `ExchangeError` covers configuration problems detected at bind
//! time, the mandatory no-route failure, per-queue delivery failures and
//! lookups against unknown exchanges or queues.

use crate::message::Message;
use thiserror::Error;

/// Represents errors that can occur while binding queues to exchanges or
/// routing messages through them.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The exchange does not exist, is not active yet, or was deleted
    #[error("exchange `{0}` not found")]
    ExchangeNotFound(String),

    /// A queue name could not be resolved by the queue collaborator
    #[error("queue `{0}` is not registered")]
    QueueNotFound(String),

    /// An exchange was re-declared with a different type
    #[error("exchange `{name}` already declared as `{existing}`, cannot redeclare as `{requested}`")]
    ExchangeKindConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// The exchange type is not one of direct, fanout, topic or headers
    #[error("unsupported exchange type `{0}`")]
    UnsupportedExchangeKind(String),

    /// A headers binding without the `x-match` argument
    #[error("headers binding requires an `x-match` argument")]
    MissingMatchMode,

    /// A headers binding whose `x-match` is neither `all` nor `any`
    #[error("invalid `x-match` value `{0}`, expected `all` or `any`")]
    InvalidMatchMode(String),

    /// A headers binding carrying `x-match` more than once
    #[error("headers binding has more than one `x-match` argument")]
    DuplicateMatchMode,

    /// A headers binding with no header criteria
    #[error("headers binding requires at least one header criterion")]
    EmptyHeadersCriteria,

    /// A textual binding entry that is not in `key=value` form
    #[error("malformed binding `{0}`, expected \"<attribute1>=<value1>,<attribute2>=<value2>\"")]
    MalformedBinding(String),

    /// The registry configuration could not be loaded
    #[error("invalid exchange configuration: {0}")]
    InvalidConfig(String),

    /// A binding listing could not be rendered for a management endpoint
    #[error("failure to encode bindings of exchange `{0}`: {1}")]
    ListingEncodeError(String, String),

    /// A mandatory message matched no binding
    #[error("exchange `{}`: message not routable", .0.exchange())]
    NoRoute(Box<Message>),

    /// One or more matched queues rejected the message
    #[error("delivered to {delivered} queue(s), {} delivery failure(s)", .failures.len())]
    PartialDelivery {
        delivered: usize,
        failures: Vec<DeliveryFailure>,
    },
}

/// Failure reported by a queue when a message is handed to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The queue reached its capacity
    #[error("queue `{0}` is full")]
    QueueFull(String),

    /// The queue was closed or deleted while routing
    #[error("queue `{0}` is closed")]
    QueueClosed(String),

    /// Any other queue-specific failure
    #[error("failure to deliver to queue `{0}`: {1}")]
    Rejected(String, String),
}

/// A delivery error together with the name of the queue that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub queue: String,
    pub error: DeliveryError,
}
