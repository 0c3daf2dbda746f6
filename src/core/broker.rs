//! Message broker collaborator.
//!
//! The broker delivers topic-routed messages into the gateway. The
//! dispatch core only binds wildcard subscriptions at startup and reads a
//! status descriptor for operational endpoints; exchange and queue
//! mechanics belong to the broker implementation.
//!
//! [`EmbeddedBroker`] is the reference implementation: an in-process
//! loopback exchange with AMQP-style dot-segmented routing keys and
//! single-segment `*` wildcards.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Callback invoked with `(routing_key, payload)` for every delivered
/// message matching a subscription.
pub type BrokerHandler = Arc<dyn Fn(String, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Errors reported by a broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A subscription pattern that cannot be bound
    #[error("invalid binding pattern: {0}")]
    InvalidPattern(String),

    /// Backend fault
    #[error("broker backend failure: {0}")]
    Backend(String),
}

/// Topic-routing interface consumed by the dispatch core.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Bind `handler` to every routing key matching `pattern`.
    ///
    /// Patterns are dot-segmented; a `*` segment matches exactly one key
    /// segment. Binding failures are startup-fatal for the gateway.
    async fn listen_exchange(
        &self,
        pattern: &str,
        handler: BrokerHandler,
    ) -> Result<(), BrokerError>;

    /// Publish a message to every matching subscription.
    async fn publish(&self, routing_key: &str, payload: Value) -> Result<(), BrokerError>;

    /// Live status descriptor for operational endpoints.
    async fn get_infos(&self) -> Result<Value, BrokerError>;
}

struct Binding {
    pattern: Vec<String>,
    handler: BrokerHandler,
}

/// In-process loopback exchange.
///
/// Bindings are appended at startup and only read afterwards; delivery
/// spawns one task per matching subscription so a slow consumer never
/// blocks the publisher.
#[derive(Default)]
pub struct EmbeddedBroker {
    bindings: RwLock<Vec<Binding>>,
}

impl EmbeddedBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(pattern: &[String], key: &[&str]) -> bool {
    pattern.len() == key.len()
        && pattern
            .iter()
            .zip(key)
            .all(|(p, k)| p == "*" || p == k)
}

#[async_trait]
impl Broker for EmbeddedBroker {
    async fn listen_exchange(
        &self,
        pattern: &str,
        handler: BrokerHandler,
    ) -> Result<(), BrokerError> {
        let segments: Vec<String> = pattern.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(BrokerError::InvalidPattern(pattern.to_string()));
        }

        debug!(pattern = %pattern, "binding exchange subscription");
        self.bindings.write().push(Binding {
            pattern: segments,
            handler,
        });
        Ok(())
    }

    async fn publish(&self, routing_key: &str, payload: Value) -> Result<(), BrokerError> {
        let key: Vec<&str> = routing_key.split('.').collect();
        let handlers: Vec<BrokerHandler> = self
            .bindings
            .read()
            .iter()
            .filter(|binding| matches(&binding.pattern, &key))
            .map(|binding| Arc::clone(&binding.handler))
            .collect();

        debug!(
            routing_key = %routing_key,
            subscriptions = handlers.len(),
            "delivering broker message"
        );
        for handler in handlers {
            tokio::spawn(handler(routing_key.to_string(), payload.clone()));
        }
        Ok(())
    }

    async fn get_infos(&self) -> Result<Value, BrokerError> {
        Ok(json!({
            "type": "embedded",
            "bindings": self.bindings.read().len(),
        }))
    }
}
