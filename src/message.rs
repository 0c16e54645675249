// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Published Message
//!
//! The routing view of a decoded `basic.publish`: target exchange, routing key,
//! content properties (which carry the header table), body and the publish
//! flags. Header values are rendered to strings for matching.

use lapin::{
    types::{AMQPValue, FieldTable},
    BasicProperties,
};
use std::collections::BTreeMap;

/// Header table of a message rendered as `name -> string value`.
pub type HeaderValues = BTreeMap<String, String>;

/// A published message as seen by the exchange layer.
///
/// Built with the same chaining style as the topology definitions:
/// `Message::new("amq.match", b"payload".to_vec()).headers(table).mandatory()`.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub(crate) exchange: String,
    pub(crate) routing_key: String,
    pub(crate) properties: BasicProperties,
    pub(crate) body: Vec<u8>,
    pub(crate) mandatory: bool,
    pub(crate) immediate: bool,
}

impl Message {
    /// Creates a non-mandatory message published to `exchange` with an empty
    /// routing key and no headers.
    pub fn new(exchange: &str, body: Vec<u8>) -> Message {
        Message {
            exchange: exchange.to_owned(),
            body,
            ..Message::default()
        }
    }

    /// Sets the routing key, used by direct and topic exchanges.
    ///
    /// # Parameters
    /// * `key` - The routing key
    ///
    /// # Returns
    /// Self for method chaining
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }

    /// Replaces the content properties.
    pub fn properties(mut self, properties: BasicProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the header table inside the content properties.
    pub fn headers(mut self, headers: FieldTable) -> Self {
        self.properties = self.properties.with_headers(headers);
        self
    }

    /// Requires the message to be routed to at least one queue.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Requires an available consumer; enforced by the queue on delivery.
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Name of the exchange the message was published to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The routing key, empty when the publisher set none.
    pub fn key(&self) -> &str {
        &self.routing_key
    }

    /// The message payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The content header properties.
    pub fn content_properties(&self) -> &BasicProperties {
        &self.properties
    }

    /// Whether an unroutable message must be returned to the publisher.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Whether the publisher asked for immediate delivery.
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// The raw header table, if the message carries one.
    pub fn header_table(&self) -> Option<&FieldTable> {
        self.properties.headers().as_ref()
    }

    /// Renders the header table for matching. A message without a headers
    /// section yields an empty map.
    pub fn header_values(&self) -> HeaderValues {
        self.header_table()
            .map(|table| {
                table
                    .inner()
                    .iter()
                    .map(|(key, value)| (key.as_str().to_owned(), value_to_string(value)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// String rendering of an AMQP field value, so that typed values compare with
/// the string form given in bind arguments (`LongInt(5)` equals `"5"`).
pub fn value_to_string(value: &AMQPValue) -> String {
    match value {
        AMQPValue::Boolean(v) => v.to_string(),
        AMQPValue::ShortShortInt(v) => v.to_string(),
        AMQPValue::ShortShortUInt(v) => v.to_string(),
        AMQPValue::ShortInt(v) => v.to_string(),
        AMQPValue::ShortUInt(v) => v.to_string(),
        AMQPValue::LongInt(v) => v.to_string(),
        AMQPValue::LongUInt(v) => v.to_string(),
        AMQPValue::LongLongInt(v) => v.to_string(),
        AMQPValue::Float(v) => v.to_string(),
        AMQPValue::Double(v) => v.to_string(),
        AMQPValue::Timestamp(v) => v.to_string(),
        AMQPValue::ShortString(v) => v.as_str().to_owned(),
        AMQPValue::LongString(v) => String::from_utf8_lossy(v.as_bytes()).into_owned(),
        AMQPValue::Void => String::new(),
        other => format!("{other:?}"),
    }
}
