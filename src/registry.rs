// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Registry
//!
//! Process-wide mapping from exchange name to exchange. This is the entry
//! point used by protocol handlers: they resolve the exchange by name and the
//! registry delegates to it. Lookups clone the `Arc` out of the map so that no
//! map lock is held while routing.

use crate::{
    config::RegistryConfig,
    errors::ExchangeError,
    exchange::{Exchange, ExchangeKind},
    message::Message,
    queue::QueueRef,
    router::RouteOutcome,
};
use dashmap::{mapref::entry::Entry, DashMap};
use lapin::types::FieldTable;
use std::sync::Arc;
use tracing::debug;

/// Name to exchange mapping, shared by every connection of the broker.
#[derive(Debug, Default)]
pub struct ExchangeRegistry {
    exchanges: DashMap<String, Arc<Exchange>>,
}

impl ExchangeRegistry {
    /// Creates an empty registry.
    pub fn new() -> ExchangeRegistry {
        ExchangeRegistry::default()
    }

    /// Creates a registry with the exchanges named by `cfg` already declared.
    pub fn with_config(cfg: &RegistryConfig) -> Result<ExchangeRegistry, ExchangeError> {
        let registry = ExchangeRegistry::new();
        for declaration in cfg.declarations() {
            registry.declare(&declaration.name, declaration.kind)?;
        }
        Ok(registry)
    }

    /// Declares an exchange. Declaring an existing name with the same type
    /// returns the existing exchange; a different type is a conflict.
    ///
    /// # Parameters
    /// * `name` - The name of the exchange
    /// * `kind` - The exchange type
    ///
    /// # Returns
    /// The active exchange or `ExchangeKindConflict`
    pub fn declare(&self, name: &str, kind: ExchangeKind) -> Result<Arc<Exchange>, ExchangeError> {
        match self.exchanges.entry(name.to_owned()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.kind() != kind {
                    return Err(ExchangeError::ExchangeKindConflict {
                        name: name.to_owned(),
                        existing: existing.kind().to_string(),
                        requested: kind.to_string(),
                    });
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(entry) => {
                debug!(exchange = name, kind = kind.as_str(), "creating exchange");
                let exchange = Arc::new(Exchange::new(name, kind));
                exchange.activate();
                entry.insert(Arc::clone(&exchange));
                Ok(exchange)
            }
        }
    }

    /// Resolves an exchange by name.
    pub fn get(&self, name: &str) -> Result<Arc<Exchange>, ExchangeError> {
        self.exchanges
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExchangeError::ExchangeNotFound(name.to_owned()))
    }

    /// Deletes the exchange and its bindings. Holders of the exchange see
    /// not-found errors from then on.
    pub fn delete(&self, name: &str) -> Result<(), ExchangeError> {
        let (_, exchange) = self
            .exchanges
            .remove(name)
            .ok_or_else(|| ExchangeError::ExchangeNotFound(name.to_owned()))?;
        exchange.delete();
        Ok(())
    }

    /// Names of every declared exchange, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exchanges.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Binds `queue` to the named exchange. See [`Exchange::bind`].
    pub fn bind(
        &self,
        exchange: &str,
        queue: QueueRef,
        routing_key: &str,
        arguments: &FieldTable,
    ) -> Result<(), ExchangeError> {
        self.get(exchange)?.bind(queue, routing_key, arguments)
    }

    /// Removes the binding of `queue` from the named exchange; unbinding an
    /// unbound queue is a no-op.
    pub fn unbind(&self, exchange: &str, queue: &QueueRef) -> Result<bool, ExchangeError> {
        self.get(exchange)?.unbind(queue)
    }

    /// Removes every binding to `queue`, called when the queue is deleted.
    /// Returns the number of exchanges that held a binding.
    pub fn unbind_queue(&self, queue: &QueueRef) -> usize {
        let exchanges: Vec<Arc<Exchange>> =
            self.exchanges.iter().map(|e| Arc::clone(e.value())).collect();

        let removed = exchanges
            .iter()
            .filter(|exchange| exchange.unbind(queue).unwrap_or(false))
            .count();

        debug!(queue = queue.name(), exchanges = removed, "queue unbound from exchanges");
        removed
    }

    /// Routes `message` through the exchange it was published to.
    pub fn route(&self, message: Message) -> Result<RouteOutcome, ExchangeError> {
        self.get(message.exchange())?.route(message)
    }

    /// Whether `queue` is bound to the named exchange.
    pub fn is_bound(&self, exchange: &str, queue: &QueueRef) -> Result<bool, ExchangeError> {
        self.get(exchange)?.is_bound(queue)
    }

    /// Whether a message with `routing_key` could reach a queue through the
    /// named exchange.
    pub fn is_bound_key(&self, exchange: &str, routing_key: &str) -> Result<bool, ExchangeError> {
        self.get(exchange)?.is_bound_key(routing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ExchangeDeclaration, queue::MockQueueDelivery};

    fn queue(name: &str) -> QueueRef {
        QueueRef::new(name, Arc::new(MockQueueDelivery::new()))
    }

    #[test]
    fn declare_is_idempotent_for_same_kind() {
        let registry = ExchangeRegistry::new();
        let first = registry.declare("events", ExchangeKind::Topic).unwrap();
        let second = registry.declare("events", ExchangeKind::Topic).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn redeclare_with_other_kind_conflicts() {
        let registry = ExchangeRegistry::new();
        registry.declare("events", ExchangeKind::Topic).unwrap();

        let res = registry.declare("events", ExchangeKind::Headers);

        assert!(matches!(
            res,
            Err(ExchangeError::ExchangeKindConflict { existing, requested, .. })
                if existing == "topic" && requested == "headers"
        ));
        assert_eq!(registry.get("events").unwrap().kind(), ExchangeKind::Topic);
    }

    #[test]
    fn unknown_exchange_is_not_found() {
        let registry = ExchangeRegistry::new();
        assert!(matches!(
            registry.route(Message::new("missing", vec![])),
            Err(ExchangeError::ExchangeNotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            registry.unbind("missing", &queue("q")),
            Err(ExchangeError::ExchangeNotFound(_))
        ));
    }

    #[test]
    fn delete_invalidates_held_exchange() {
        let registry = ExchangeRegistry::new();
        let held = registry.declare("events", ExchangeKind::Fanout).unwrap();
        held.bind(queue("q"), "", &FieldTable::default()).unwrap();

        registry.delete("events").unwrap();

        assert!(registry.get("events").is_err());
        assert!(matches!(held.has_bindings(), Err(ExchangeError::ExchangeNotFound(_))));
        assert!(registry.delete("events").is_err());
    }

    #[test]
    fn unbind_queue_cleans_every_exchange() {
        let registry = ExchangeRegistry::new();
        registry.declare("a", ExchangeKind::Fanout).unwrap();
        registry.declare("b", ExchangeKind::Direct).unwrap();
        registry.declare("c", ExchangeKind::Topic).unwrap();
        let q = queue("q");
        registry.bind("a", q.clone(), "", &FieldTable::default()).unwrap();
        registry.bind("b", q.clone(), "key", &FieldTable::default()).unwrap();

        assert_eq!(registry.unbind_queue(&q), 2);
        assert!(!registry.is_bound("a", &q).unwrap());
        assert!(!registry.is_bound("b", &q).unwrap());
        assert_eq!(registry.unbind_queue(&q), 0);
    }

    #[test]
    fn config_declares_exchanges() {
        let cfg = RegistryConfig {
            standard_exchanges: true,
            exchanges: vec![ExchangeDeclaration {
                name: "events".to_owned(),
                kind: ExchangeKind::Topic,
            }],
        };

        let registry = ExchangeRegistry::with_config(&cfg).unwrap();

        assert_eq!(
            registry.names(),
            vec!["amq.direct", "amq.fanout", "amq.match", "amq.topic", "events"]
        );
        assert_eq!(registry.get("amq.match").unwrap().kind(), ExchangeKind::Headers);
    }

    #[test]
    fn config_conflicting_with_standard_exchange_fails() {
        let cfg = RegistryConfig {
            standard_exchanges: true,
            exchanges: vec![ExchangeDeclaration {
                name: "amq.topic".to_owned(),
                kind: ExchangeKind::Fanout,
            }],
        };

        assert!(matches!(
            ExchangeRegistry::with_config(&cfg),
            Err(ExchangeError::ExchangeKindConflict { .. })
        ));
    }
}
