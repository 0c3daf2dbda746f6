//! Broker listener.
//!
//! Binds one wildcard subscription per registered controller at startup.
//! Routing keys are strictly `<controller>.<collection>.<action>`; a key
//! with any other segment count is a transport fault and is logged, never
//! coerced into a dispatch. Dispatch outcomes are logged, since no
//! caller awaits a response on this transport.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::core::broker::{Broker, BrokerHandler};
use crate::errors::GatewayResult;
use crate::funnel::Funnel;
use crate::request::{Request, RequestContext, RequestOverrides};

/// Bind `<controller>.*.*` subscriptions for every registered controller.
///
/// A binding failure is startup-fatal: the gateway refuses to serve with
/// a partially wired broker transport.
pub async fn bind_broker_listeners(
    funnel: Arc<Funnel>,
    broker: Arc<dyn Broker>,
) -> GatewayResult<()> {
    for controller in funnel.controllers() {
        let pattern = format!("{controller}.*.*");
        let funnel = Arc::clone(&funnel);
        let handler: BrokerHandler = Arc::new(move |routing_key, payload| {
            let funnel = Arc::clone(&funnel);
            Box::pin(async move { dispatch_message(funnel, routing_key, payload).await })
        });

        broker.listen_exchange(&pattern, handler).await?;
        info!(pattern = %pattern, "broker subscription bound");
    }
    Ok(())
}

/// Decompose one delivered message and run it through the funnel.
pub(crate) async fn dispatch_message(funnel: Arc<Funnel>, routing_key: String, payload: Value) {
    let segments: Vec<&str> = routing_key.split('.').collect();
    let &[controller, collection, action] = segments.as_slice() else {
        error!(
            routing_key = %routing_key,
            "malformed routing key, expected <controller>.<collection>.<action>"
        );
        return;
    };

    let request = Request::normalize(
        payload,
        controller,
        RequestOverrides::default().collection(collection).action(action),
        RequestContext::anonymous(),
    );
    let response = funnel.execute(request).await;
    if let Some(descriptor) = response.error() {
        error!(
            routing_key = %routing_key,
            error = %descriptor.message,
            "broker dispatch failed"
        );
    }
}
