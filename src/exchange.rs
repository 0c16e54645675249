// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchanges
//!
//! An exchange is a named routing unit of a fixed type that owns its bindings.
//! The type decides how bind arguments become a predicate:
//! - Direct: the binding key must equal the routing key
//! - Fanout: every bound queue receives every message
//! - Topic: the binding key is a wildcard pattern over the routing key
//! - Headers: bind arguments describe a predicate over the message headers

use crate::{
    binding::{Binding, BindingPredicate, BindingRegistry, BindingSnapshot},
    errors::ExchangeError,
    headers::HeadersPredicate,
    message::Message,
    queue::QueueRef,
    router::{self, RouteOutcome},
    topic::TopicPattern,
};
use lapin::types::FieldTable;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU8, Ordering},
};
use tracing::debug;

/// Represents the types of exchanges handled by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl ExchangeKind {
    /// The AMQP type name of the exchange kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            "headers" => Ok(ExchangeKind::Headers),
            other => Err(ExchangeError::UnsupportedExchangeKind(other.to_owned())),
        }
    }
}

impl TryFrom<&lapin::ExchangeKind> for ExchangeKind {
    type Error = ExchangeError;

    /// Converts the kind decoded from an `exchange.declare` frame. Custom kinds
    /// such as `x-delayed-message` are not routed by this layer.
    fn try_from(kind: &lapin::ExchangeKind) -> Result<Self, Self::Error> {
        match kind {
            lapin::ExchangeKind::Direct => Ok(ExchangeKind::Direct),
            lapin::ExchangeKind::Fanout => Ok(ExchangeKind::Fanout),
            lapin::ExchangeKind::Topic => Ok(ExchangeKind::Topic),
            lapin::ExchangeKind::Headers => Ok(ExchangeKind::Headers),
            lapin::ExchangeKind::Custom(name) => {
                Err(ExchangeError::UnsupportedExchangeKind(name.clone()))
            }
        }
    }
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
        }
    }
}

/// Lifecycle of an exchange. Only `Active` exchanges accept operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExchangeState {
    Created = 0,
    Active = 1,
    Deleted = 2,
}

impl From<u8> for ExchangeState {
    fn from(value: u8) -> Self {
        match value {
            0 => ExchangeState::Created,
            1 => ExchangeState::Active,
            _ => ExchangeState::Deleted,
        }
    }
}

/// A named routing unit owning its bindings.
///
/// The type is fixed at creation. Bind, unbind and route are only accepted
/// while the exchange is `Active`.
pub struct Exchange {
    name: String,
    kind: ExchangeKind,
    state: AtomicU8,
    bindings: BindingRegistry,
}

impl Exchange {
    /// Creates an exchange in the `Created` state.
    ///
    /// # Parameters
    /// * `name` - The name of the exchange
    /// * `kind` - The exchange type
    ///
    /// # Returns
    /// A new exchange with no bindings
    pub fn new(name: &str, kind: ExchangeKind) -> Exchange {
        Exchange {
            name: name.to_owned(),
            kind,
            state: AtomicU8::new(ExchangeState::Created as u8),
            bindings: BindingRegistry::new(),
        }
    }

    /// The name of the exchange.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exchange type.
    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ExchangeState {
        ExchangeState::from(self.state.load(Ordering::Acquire))
    }

    /// Moves a `Created` exchange to `Active`. Has no effect on a deleted one.
    pub fn activate(&self) {
        let _ = self.state.compare_exchange(
            ExchangeState::Created as u8,
            ExchangeState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Moves the exchange to `Deleted` and drops its bindings.
    pub fn delete(&self) {
        self.state
            .store(ExchangeState::Deleted as u8, Ordering::Release);
        self.bindings.clear();
        debug!(exchange = self.name, "exchange deleted");
    }

    fn ensure_active(&self) -> Result<(), ExchangeError> {
        match self.state() {
            ExchangeState::Active => Ok(()),
            _ => Err(ExchangeError::ExchangeNotFound(self.name.clone())),
        }
    }

    /// Builds the predicate for this exchange's type from `queue.bind` fields.
    pub fn predicate(
        &self,
        routing_key: &str,
        arguments: &FieldTable,
    ) -> Result<BindingPredicate, ExchangeError> {
        match self.kind {
            ExchangeKind::Direct => Ok(BindingPredicate::Direct(routing_key.to_owned())),
            ExchangeKind::Fanout => Ok(BindingPredicate::Fanout),
            ExchangeKind::Topic => Ok(BindingPredicate::Topic(TopicPattern::new(routing_key))),
            ExchangeKind::Headers => Ok(BindingPredicate::Headers(
                HeadersPredicate::from_arguments(arguments)?,
            )),
        }
    }

    /// Binds `queue` with a predicate built from the routing key and
    /// arguments. A second bind for the same queue replaces the first.
    ///
    /// # Parameters
    /// * `queue` - The queue to bind
    /// * `routing_key` - Binding key, used by direct and topic exchanges
    /// * `arguments` - Binding arguments, used by headers exchanges
    ///
    /// # Returns
    /// Ok(()) on success or a configuration error leaving the bindings unchanged
    pub fn bind(
        &self,
        queue: QueueRef,
        routing_key: &str,
        arguments: &FieldTable,
    ) -> Result<(), ExchangeError> {
        self.ensure_active()?;
        let predicate = self.predicate(routing_key, arguments)?;
        self.bind_predicate(queue, predicate)
    }

    /// Binds `queue` with an already validated predicate.
    pub fn bind_predicate(
        &self,
        queue: QueueRef,
        predicate: BindingPredicate,
    ) -> Result<(), ExchangeError> {
        self.ensure_active()?;

        debug!(
            exchange = self.name,
            queue = queue.name(),
            predicate = ?predicate,
            "binding queue"
        );

        if self.bindings.add(Binding::new(predicate, queue)) {
            debug!(exchange = self.name, "replaced existing binding");
        }

        Ok(())
    }

    /// Removes the binding for `queue`; unbinding an unbound queue is a no-op.
    pub fn unbind(&self, queue: &QueueRef) -> Result<bool, ExchangeError> {
        self.ensure_active()?;
        debug!(exchange = self.name, queue = queue.name(), "unbinding queue");
        Ok(self.bindings.remove(queue))
    }

    /// Whether `queue` has a binding on this exchange.
    pub fn is_bound(&self, queue: &QueueRef) -> Result<bool, ExchangeError> {
        self.ensure_active()?;
        Ok(self.bindings.contains_queue(queue))
    }

    /// Whether a message published with `routing_key` could reach a queue.
    /// Headers and fanout exchanges ignore the key.
    pub fn is_bound_key(&self, routing_key: &str) -> Result<bool, ExchangeError> {
        self.ensure_active()?;
        let snapshot = self.bindings.snapshot();

        Ok(match self.kind {
            ExchangeKind::Direct | ExchangeKind::Topic => snapshot
                .iter()
                .any(|b| b.predicate.matches(routing_key, &Default::default())),
            ExchangeKind::Fanout | ExchangeKind::Headers => !snapshot.is_empty(),
        })
    }

    /// Whether any queue is bound.
    pub fn has_bindings(&self) -> Result<bool, ExchangeError> {
        self.ensure_active()?;
        Ok(!self.bindings.is_empty())
    }

    /// Point-in-time view of the bindings, in binding order.
    pub fn bindings(&self) -> Result<BindingSnapshot, ExchangeError> {
        self.ensure_active()?;
        Ok(self.bindings.snapshot())
    }

    /// Routes `message` to every queue whose binding matches.
    pub fn route(&self, message: Message) -> Result<RouteOutcome, ExchangeError> {
        self.ensure_active()?;
        router::route(self, self.bindings.snapshot(), message)
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
