//! Subscription controller.
//!
//! Joins and leaves realtime rooms on behalf of the request's connection.
//! All room bookkeeping and filter matching lives in the subscription
//! registry collaborator.

use std::sync::Arc;

use serde_json::Value;

use crate::core::realtime::SubscriptionRegistry;
use crate::errors::GatewayResult;
use crate::request::Request;

pub struct SubscribeController {
    subscriptions: Arc<dyn SubscriptionRegistry>,
}

impl SubscribeController {
    pub fn new(subscriptions: Arc<dyn SubscriptionRegistry>) -> Self {
        Self { subscriptions }
    }

    /// Subscribe the request's connection to its target room.
    pub async fn on(&self, request: &Request) -> GatewayResult<Value> {
        Ok(self.subscriptions.subscribe(request).await?)
    }

    /// Remove the request's connection from its target room.
    pub async fn off(&self, request: &Request) -> GatewayResult<Value> {
        Ok(self.subscriptions.unsubscribe(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::InMemorySubscriptions;
    use crate::errors::GatewayError;
    use crate::request::{RequestContext, RequestOverrides};
    use serde_json::json;

    fn request() -> Request {
        Request::normalize(
            json!({}),
            "subscribe",
            RequestOverrides::default().index("library").collection("books"),
            RequestContext::anonymous(),
        )
    }

    #[tokio::test]
    async fn test_on_then_off_round_trip() {
        let registry = Arc::new(InMemorySubscriptions::new());
        let ctrl = SubscribeController::new(Arc::clone(&registry) as Arc<dyn SubscriptionRegistry>);

        let req = request();
        let joined = ctrl.on(&req).await.unwrap();
        assert_eq!(joined["roomId"], "library/books");
        assert_eq!(registry.realtime_rooms().await.len(), 1);

        ctrl.off(&req).await.unwrap();
        assert!(registry.realtime_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_registry_failures_propagate_unchanged() {
        let ctrl = SubscribeController::new(Arc::new(InMemorySubscriptions::new()));
        let err = ctrl.off(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Collaborator { service: "subscriptions", .. }
        ));
    }
}
