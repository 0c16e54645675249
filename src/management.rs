// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Management Adapter
//!
//! Read-mostly adapter over the exchange registry used by management
//! endpoints: lists bindings for introspection and creates headers bindings
//! from the textual form `<attribute1>=<value1>,<attribute2>=<value2>`.

use crate::{
    binding::BindingPredicate,
    errors::ExchangeError,
    exchange::ExchangeKind,
    headers::HeadersPredicate,
    queue::QueueLookup,
    registry::ExchangeRegistry,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// One row of a binding listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingListing {
    /// Position of the binding, starting at 1
    pub index: usize,
    /// Name of the bound queue
    pub queue_name: String,
    /// Predicate rendered as `key=value` strings
    pub bindings: Vec<String>,
}

/// Management view over the exchange registry and the queue collaborator.
pub struct ManagementAdapter {
    exchanges: Arc<ExchangeRegistry>,
    queues: Arc<dyn QueueLookup>,
}

impl ManagementAdapter {
    /// Creates a new management adapter.
    ///
    /// # Parameters
    /// * `exchanges` - The registry the adapter reads and binds through
    /// * `queues` - Resolves queue names given by management callers
    pub fn new(exchanges: Arc<ExchangeRegistry>, queues: Arc<dyn QueueLookup>) -> ManagementAdapter {
        ManagementAdapter { exchanges, queues }
    }

    /// Lists the bindings of `exchange` in binding order.
    pub fn bindings(&self, exchange: &str) -> Result<Vec<BindingListing>, ExchangeError> {
        let snapshot = self.exchanges.get(exchange)?.bindings()?;

        Ok(snapshot
            .iter()
            .enumerate()
            .map(|(i, binding)| BindingListing {
                index: i + 1,
                queue_name: binding.queue().name().to_owned(),
                bindings: binding.predicate().mappings(),
            })
            .collect())
    }

    /// Listing rendered as JSON for management endpoints.
    pub fn bindings_json(&self, exchange: &str) -> Result<String, ExchangeError> {
        let listing = self.bindings(exchange)?;
        serde_json::to_string(&listing).map_err(|err| {
            error!(error = err.to_string(), "failure to encode binding listing");
            ExchangeError::ListingEncodeError(exchange.to_owned(), err.to_string())
        })
    }

    /// Binds the named queue to a headers exchange using the textual form.
    ///
    /// # Parameters
    /// * `exchange` - Name of a headers exchange
    /// * `queue_name` - Name resolved through the queue collaborator
    /// * `binding` - Criteria as `<attribute1>=<value1>,<attribute2>=<value2>`
    ///
    /// # Returns
    /// Ok(()) on success, or a configuration error leaving the exchange unchanged
    pub fn create_binding(
        &self,
        exchange: &str,
        queue_name: &str,
        binding: &str,
    ) -> Result<(), ExchangeError> {
        let exchange = self.exchanges.get(exchange)?;

        if exchange.kind() != ExchangeKind::Headers {
            return Err(ExchangeError::UnsupportedExchangeKind(
                exchange.kind().to_string(),
            ));
        }

        let Some(queue) = self.queues.queue(queue_name) else {
            error!(queue = queue_name, "queue is not registered");
            return Err(ExchangeError::QueueNotFound(queue_name.to_owned()));
        };

        let predicate = HeadersPredicate::from_text(binding)?;
        debug!(
            exchange = exchange.name(),
            queue = queue_name,
            binding,
            "creating binding from management"
        );

        exchange.bind_predicate(queue, BindingPredicate::Headers(predicate))
    }
}
