// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue References
//!
//! Queues are owned by the queue-management subsystem. The exchange layer only
//! holds `QueueRef`s: a uuid identity, the queue name and a handle to the
//! queue's delivery entry point. Bindings compare queues by identity alone.

use crate::{errors::DeliveryError, message::Message};
use std::{fmt, sync::Arc};
use uuid::Uuid;

/// Delivery entry point of a queue.
///
/// `deliver` may block according to the queue's own back-pressure policy.
/// Errors are reported back to the router, which keeps forwarding to the
/// remaining matched queues.
#[cfg_attr(test, mockall::automock)]
pub trait QueueDelivery: Send + Sync {
    fn deliver(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Resolves queue names, used by the management adapter.
#[cfg_attr(test, mockall::automock)]
pub trait QueueLookup: Send + Sync {
    /// Returns the queue registered under `name`, if any.
    fn queue(&self, name: &str) -> Option<QueueRef>;
}

/// Non-owning reference to a queue.
#[derive(Clone)]
pub struct QueueRef {
    id: Uuid,
    name: String,
    delivery: Arc<dyn QueueDelivery>,
}

impl QueueRef {
    /// Creates a reference with a fresh identity.
    pub fn new(name: &str, delivery: Arc<dyn QueueDelivery>) -> QueueRef {
        QueueRef::with_id(Uuid::new_v4(), name, delivery)
    }

    /// Creates a reference for a queue whose identity is already known.
    pub fn with_id(id: Uuid, name: &str, delivery: Arc<dyn QueueDelivery>) -> QueueRef {
        QueueRef {
            id,
            name: name.to_owned(),
            delivery,
        }
    }

    /// Identity of the queue, used for binding equality.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The name of the queue.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands the message to the queue.
    pub fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        self.delivery.deliver(message)
    }
}

impl PartialEq for QueueRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueueRef {}

impl fmt::Debug for QueueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
