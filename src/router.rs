// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Routing Executor
//!
//! Evaluates a binding snapshot against a published message and forwards the
//! message to every matching queue. The steps are:
//! 1. Render the message headers once
//! 2. Evaluate each binding in snapshot order
//! 3. Forward to every match, collecting per-queue delivery failures
//! 4. Apply the mandatory policy when nothing matched

use crate::{
    binding::BindingSnapshot,
    errors::{DeliveryFailure, ExchangeError},
    exchange::Exchange,
    message::Message,
    otel,
};
use opentelemetry::{
    global,
    trace::{Span, Status},
    KeyValue,
};
use std::borrow::Cow;
use tracing::{debug, error, warn};

/// Result of a routing pass that raised no error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    delivered: Vec<String>,
}

impl RouteOutcome {
    /// Number of queues the message was handed to.
    pub fn delivered(&self) -> usize {
        self.delivered.len()
    }

    /// Names of the queues the message was handed to, in delivery order.
    pub fn queues(&self) -> &[String] {
        &self.delivered
    }
}

/// Routes `message` against `bindings`, a snapshot taken from `exchange`.
///
/// A message matching N bindings is forwarded N times, once per distinct
/// queue. A failing queue does not stop forwarding to the others; failures
/// are reported together as `PartialDelivery` once every match was tried.
pub(crate) fn route(
    exchange: &Exchange,
    bindings: BindingSnapshot,
    message: Message,
) -> Result<RouteOutcome, ExchangeError> {
    let tracer = global::tracer(otel::TRACER_NAME);
    let (_ctx, mut span) = otel::new_span(&message, &tracer, exchange.name());
    span.set_attribute(KeyValue::new(
        "messaging.destination.name",
        exchange.name().to_owned(),
    ));
    span.set_attribute(KeyValue::new(
        "messaging.rabbitmq.destination.routing_key",
        message.key().to_owned(),
    ));

    let headers = message.header_values();
    debug!(
        exchange = exchange.name(),
        routing_key = message.key(),
        headers = ?headers,
        "routing message"
    );

    if message.is_immediate() {
        debug!(exchange = exchange.name(), "immediate delivery is enforced by the queues");
    }

    let mut matched = 0usize;
    let mut outcome = RouteOutcome::default();
    let mut failures = vec![];

    for binding in bindings.iter() {
        if !binding.predicate.matches(message.key(), &headers) {
            continue;
        }

        matched += 1;
        let queue = binding.queue.name();
        debug!(exchange = exchange.name(), queue, "delivering message");

        match binding.queue.deliver(&message) {
            Ok(()) => outcome.delivered.push(queue.to_owned()),
            Err(err) => {
                error!(
                    error = err.to_string(),
                    exchange = exchange.name(),
                    queue,
                    "failure to deliver message"
                );
                failures.push(DeliveryFailure {
                    queue: queue.to_owned(),
                    error: err,
                });
            }
        }
    }

    span.set_attribute(KeyValue::new("messaging.exchange.matched", matched as i64));

    if matched == 0 {
        if message.is_mandatory() {
            let err = ExchangeError::NoRoute(Box::new(message));
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from("message not routable"),
            });
            return Err(err);
        }

        warn!(exchange = exchange.name(), "message not routable");
        span.set_status(Status::Ok);
        return Ok(outcome);
    }

    if !failures.is_empty() {
        let err = ExchangeError::PartialDelivery {
            delivered: outcome.delivered(),
            failures,
        };
        span.record_error(&err);
        span.set_status(Status::Error {
            description: Cow::from("delivery failure"),
        });
        return Err(err);
    }

    span.set_status(Status::Ok);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::DeliveryError,
        exchange::ExchangeKind,
        queue::{MockQueueDelivery, QueueRef},
    };
    use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
    use std::sync::Arc;

    fn exchange(kind: ExchangeKind) -> Exchange {
        let exchange = Exchange::new("ex", kind);
        exchange.activate();
        exchange
    }

    fn expecting(times: usize) -> QueueRef {
        let mut delivery = MockQueueDelivery::new();
        delivery.expect_deliver().times(times).returning(|_| Ok(()));
        QueueRef::new("q", Arc::new(delivery))
    }

    fn named(name: &str, times: usize) -> QueueRef {
        let mut delivery = MockQueueDelivery::new();
        delivery.expect_deliver().times(times).returning(|_| Ok(()));
        QueueRef::new(name, Arc::new(delivery))
    }

    fn table(pairs: &[(&str, &str)]) -> FieldTable {
        let mut table = FieldTable::default();
        for (key, value) in pairs {
            table.insert(
                ShortString::from(*key),
                AMQPValue::LongString(LongString::from(*value)),
            );
        }
        table
    }

    #[test]
    fn fanout_delivers_regardless_of_key_and_headers() {
        let ex = exchange(ExchangeKind::Fanout);
        ex.bind(expecting(2), "ignored", &FieldTable::default()).unwrap();

        let first = ex.route(Message::new("ex", vec![]).routing_key("a")).unwrap();
        let second = ex
            .route(Message::new("ex", vec![]).headers(table(&[("type", "x")])))
            .unwrap();

        assert_eq!(first.delivered(), 1);
        assert_eq!(second.delivered(), 1);
    }

    #[test]
    fn direct_delivers_on_exact_key() {
        let ex = exchange(ExchangeKind::Direct);
        ex.bind(named("orders", 1), "orders", &FieldTable::default()).unwrap();
        ex.bind(named("audit", 0), "audit", &FieldTable::default()).unwrap();

        let outcome = ex.route(Message::new("ex", vec![]).routing_key("orders")).unwrap();

        assert_eq!(outcome.queues(), &["orders".to_owned()]);
    }

    #[test]
    fn delivery_follows_binding_order() {
        let ex = exchange(ExchangeKind::Topic);
        ex.bind(named("first", 1), "logs.#", &FieldTable::default()).unwrap();
        ex.bind(named("second", 1), "*.error", &FieldTable::default()).unwrap();
        ex.bind(named("third", 0), "metrics.*", &FieldTable::default()).unwrap();

        let outcome = ex.route(Message::new("ex", vec![]).routing_key("logs.error")).unwrap();

        assert_eq!(outcome.queues(), &["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn headers_exchange_routes_on_criteria() {
        let ex = exchange(ExchangeKind::Headers);
        ex.bind(
            named("reports", 1),
            "",
            &table(&[("x-match", "all"), ("type", "report"), ("urgent", "")]),
        )
        .unwrap();

        let missing = ex
            .route(Message::new("ex", vec![]).headers(table(&[("type", "report")])))
            .unwrap();
        let matching = ex
            .route(Message::new("ex", vec![]).headers(table(&[
                ("type", "report"),
                ("urgent", "yes"),
                ("extra", "x"),
            ])))
            .unwrap();

        assert_eq!(missing.delivered(), 0);
        assert_eq!(matching.delivered(), 1);
    }

    #[test]
    fn mandatory_without_route_returns_message() {
        let ex = exchange(ExchangeKind::Direct);
        ex.bind(expecting(0), "other", &FieldTable::default()).unwrap();

        let res = ex.route(Message::new("ex", b"payload".to_vec()).routing_key("orders").mandatory());

        match res {
            Err(ExchangeError::NoRoute(message)) => {
                assert_eq!(message.body(), b"payload");
                assert_eq!(message.key(), "orders");
            }
            other => panic!("expected no route, got {other:?}"),
        }
    }

    #[test]
    fn non_mandatory_without_route_is_not_an_error() {
        let ex = exchange(ExchangeKind::Headers);

        let outcome = ex.route(Message::new("ex", vec![])).unwrap();

        assert_eq!(outcome.delivered(), 0);
    }

    #[test]
    fn failing_queue_does_not_stop_other_deliveries() {
        let ex = exchange(ExchangeKind::Fanout);

        let mut failing = MockQueueDelivery::new();
        failing
            .expect_deliver()
            .times(1)
            .returning(|_| Err(DeliveryError::QueueClosed("broken".to_owned())));
        ex.bind(QueueRef::new("broken", Arc::new(failing)), "", &FieldTable::default())
            .unwrap();
        ex.bind(named("healthy", 1), "", &FieldTable::default()).unwrap();

        let res = ex.route(Message::new("ex", vec![]).mandatory());

        match res {
            Err(ExchangeError::PartialDelivery { delivered, failures }) => {
                assert_eq!(delivered, 1);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].queue, "broken");
                assert_eq!(failures[0].error, DeliveryError::QueueClosed("broken".to_owned()));
            }
            other => panic!("expected partial delivery, got {other:?}"),
        }
    }

    #[test]
    fn routing_does_not_mutate_bindings() {
        let ex = exchange(ExchangeKind::Fanout);
        ex.bind(expecting(1), "", &FieldTable::default()).unwrap();

        ex.route(Message::new("ex", vec![])).unwrap();

        assert_eq!(ex.bindings().unwrap().len(), 1);
    }
}
