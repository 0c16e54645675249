// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Integration for Routing
//!
//! Publishers propagate their trace context in the message header table. This
//! module extracts that context so that each routing pass is recorded as a
//! child span of the publish.

use crate::message::Message;
use lapin::types::{AMQPValue, FieldTable};
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    propagation::Extractor,
    trace::{SpanKind, Tracer},
    Context,
};
use std::borrow::Cow;
use tracing::error;

/// Name of the tracer used for routing spans
pub const TRACER_NAME: &str = "amqp exchange";

/// Read-only adapter exposing a message header table to OpenTelemetry
/// propagators.
pub(crate) struct HeadersExtractor<'a> {
    headers: Option<&'a FieldTable>,
}

impl<'a> HeadersExtractor<'a> {
    pub(crate) fn new(headers: Option<&'a FieldTable>) -> Self {
        Self { headers }
    }
}

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers?
            .inner()
            .iter()
            .find(|(name, _)| name.as_str() == key)
            .and_then(|(_, value)| match value {
                AMQPValue::LongString(value) => std::str::from_utf8(value.as_bytes())
                    .map_err(|e| error!("Error decoding header value {:?}", e))
                    .ok(),
                AMQPValue::ShortString(value) => Some(value.as_str()),
                _ => None,
            })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers
            .map(|table| table.inner().keys().map(|key| key.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Starts the span covering one routing pass through `exchange`, parented on
/// the context carried by the message headers.
pub(crate) fn new_span(message: &Message, tracer: &BoxedTracer, exchange: &str) -> (Context, BoxedSpan) {
    let ctx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeadersExtractor::new(message.header_table()))
    });

    let span = tracer
        .span_builder(Cow::from(format!("{exchange} route")))
        .with_kind(SpanKind::Internal)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::{LongString, ShortString};

    #[test]
    fn extractor_reads_string_headers() {
        let mut table = FieldTable::default();
        table.insert(
            ShortString::from("traceparent"),
            AMQPValue::LongString(LongString::from("00-abc-def-01")),
        );
        table.insert(ShortString::from("retries"), AMQPValue::LongInt(3));

        let extractor = HeadersExtractor::new(Some(&table));

        assert_eq!(extractor.get("traceparent"), Some("00-abc-def-01"));
        assert_eq!(extractor.get("retries"), None);
        assert_eq!(extractor.get("missing"), None);
        assert_eq!(extractor.keys(), vec!["retries", "traceparent"]);
    }

    #[test]
    fn extractor_without_headers_is_empty() {
        let extractor = HeadersExtractor::new(None);
        assert!(extractor.keys().is_empty());
        assert_eq!(extractor.get("traceparent"), None);
    }
}
