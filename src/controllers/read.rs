//! Read-side controller.
//!
//! Persisted-data queries delegate to the storage engine, collection
//! listings to the collection resolver, and operational status to the
//! storage and broker collaborators. Collaborator failures propagate
//! unchanged so the funnel's failure path applies uniformly.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use crate::core::broker::Broker;
use crate::core::collections::{CollectionResolver, CollectionType};
use crate::core::realtime::SubscriptionRegistry;
use crate::core::storage::StorageEngine;
use crate::errors::{GatewayError, GatewayResult};
use crate::request::Request;

pub struct ReadController {
    storage: Arc<dyn StorageEngine>,
    broker: Arc<dyn Broker>,
    resolver: CollectionResolver,
}

impl ReadController {
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        subscriptions: Arc<dyn SubscriptionRegistry>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        let resolver = CollectionResolver::new(Arc::clone(&storage), subscriptions);
        Self {
            storage,
            broker,
            resolver,
        }
    }

    pub async fn search(&self, request: &Request) -> GatewayResult<Value> {
        Ok(self.storage.search(request).await?)
    }

    pub async fn get(&self, request: &Request) -> GatewayResult<Value> {
        Ok(self.storage.get(request).await?)
    }

    pub async fn count(&self, request: &Request) -> GatewayResult<Value> {
        Ok(self.storage.count(request).await?)
    }

    /// Merged stored/realtime collection listing for the request's index.
    ///
    /// The type filter comes from the request content (`all` when
    /// absent); an unknown filter fails validation before either
    /// collaborator is consulted.
    pub async fn list_collections(&self, request: &Request) -> GatewayResult<Value> {
        let view_type = match request.content().get("type") {
            None | Some(Value::Null) => CollectionType::default(),
            Some(Value::String(raw)) => CollectionType::parse(raw)?,
            Some(other) => {
                return Err(GatewayError::Validation(format!(
                    "collection type must be a string, got {other}"
                )));
            }
        };
        let index = request
            .index()
            .ok_or_else(|| GatewayError::Validation("missing index".to_string()))?;

        let view = self.resolver.resolve(index, view_type).await?;
        serde_json::to_value(view).map_err(|err| GatewayError::Internal(err.to_string()))
    }

    /// Current server time, in epoch milliseconds.
    pub async fn now(&self, _request: &Request) -> GatewayResult<Value> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| GatewayError::Internal(err.to_string()))?;
        Ok(json!({"now": now.as_millis() as u64}))
    }

    pub async fn list_indexes(&self, _request: &Request) -> GatewayResult<Value> {
        let indexes = self.storage.list_indexes().await?;
        Ok(json!({"indexes": indexes}))
    }

    /// Aggregate of static version/route metadata and live collaborator
    /// status. No partial info: either status failing fails the call.
    pub async fn server_info(&self, _request: &Request) -> GatewayResult<Value> {
        let (storage_infos, broker_infos) = tokio::try_join!(
            async { self.storage.get_infos().await.map_err(GatewayError::from) },
            async { self.broker.get_infos().await.map_err(GatewayError::from) },
        )?;

        Ok(json!({
            "serverInfo": {
                "gateway": {
                    "version": env!("CARGO_PKG_VERSION"),
                    "api": {
                        "version": "1",
                        "routes": crate::controllers::api_route_table(),
                    },
                },
                "services": {
                    "storage": storage_infos,
                    "broker": broker_infos,
                },
            }
        }))
    }

    pub async fn collection_exists(&self, request: &Request) -> GatewayResult<Value> {
        Ok(Value::Bool(self.storage.collection_exists(request).await?))
    }

    pub async fn index_exists(&self, request: &Request) -> GatewayResult<Value> {
        Ok(Value::Bool(self.storage.index_exists(request).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::broker::BrokerError;
    use crate::core::realtime::InMemorySubscriptions;
    use crate::core::storage::{InMemoryStorage, StorageError};
    use crate::core::{BrokerHandler, EmbeddedBroker};
    use crate::request::{RequestContext, RequestOverrides};
    use async_trait::async_trait;

    fn controller() -> (ReadController, Arc<InMemoryStorage>, Arc<InMemorySubscriptions>) {
        let storage = Arc::new(InMemoryStorage::new());
        let subscriptions = Arc::new(InMemorySubscriptions::new());
        let ctrl = ReadController::new(
            Arc::clone(&storage) as Arc<dyn StorageEngine>,
            Arc::clone(&subscriptions) as Arc<dyn SubscriptionRegistry>,
            Arc::new(EmbeddedBroker::new()),
        );
        (ctrl, storage, subscriptions)
    }

    fn request(index: Option<&str>, content: Value) -> Request {
        let mut overrides = RequestOverrides::default().collection("books");
        if let Some(index) = index {
            overrides = overrides.index(index);
        }
        Request::normalize(content, "read", overrides, RequestContext::anonymous())
    }

    #[tokio::test]
    async fn test_search_delegates_to_the_storage_engine() {
        let (ctrl, storage, _) = controller();
        storage
            .create(&request(Some("library"), json!({"title": "Dune"})))
            .await
            .unwrap();

        let result = ctrl.search(&request(Some("library"), json!({}))).await.unwrap();
        assert_eq!(result["total"], 1);
    }

    #[tokio::test]
    async fn test_storage_failures_propagate_unchanged() {
        struct FailingStorage;

        #[async_trait]
        impl StorageEngine for FailingStorage {
            async fn search(&self, _request: &Request) -> Result<Value, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn get(&self, _request: &Request) -> Result<Value, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn count(&self, _request: &Request) -> Result<Value, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn create(&self, _request: &Request) -> Result<Value, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn list_collections(
                &self,
                _index: &str,
            ) -> Result<std::collections::BTreeSet<String>, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn list_indexes(
                &self,
            ) -> Result<std::collections::BTreeSet<String>, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn collection_exists(&self, _request: &Request) -> Result<bool, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn index_exists(&self, _request: &Request) -> Result<bool, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
            async fn get_infos(&self) -> Result<Value, StorageError> {
                Err(StorageError::Backend("foobar".into()))
            }
        }

        let ctrl = ReadController::new(
            Arc::new(FailingStorage),
            Arc::new(InMemorySubscriptions::new()),
            Arc::new(EmbeddedBroker::new()),
        );

        let err = ctrl.search(&request(Some("library"), json!({}))).await.unwrap_err();
        assert!(matches!(err, GatewayError::Collaborator { service: "storage", .. }));
        assert!(err.to_string().contains("foobar"));

        // serverInfo refuses partial info when a status collaborator fails.
        let err = ctrl.server_info(&request(None, json!({}))).await.unwrap_err();
        assert!(matches!(err, GatewayError::Collaborator { .. }));
    }

    #[tokio::test]
    async fn test_list_collections_merges_both_sources() {
        let (ctrl, storage, subscriptions) = controller();
        storage
            .create(&Request::normalize(
                json!({"title": "x"}),
                "write",
                RequestOverrides::default().index("index").collection("foo"),
                RequestContext::anonymous(),
            ))
            .await
            .unwrap();
        subscriptions.seed_room("foo", "index");
        subscriptions.seed_room("bar", "index");
        subscriptions.seed_room("baz", "wrong");

        let result = ctrl
            .list_collections(&request(Some("index"), json!({})))
            .await
            .unwrap();
        assert_eq!(result["type"], "all");
        assert_eq!(result["collections"]["stored"], json!(["foo"]));
        assert_eq!(result["collections"]["realtime"], json!(["bar", "foo"]));
    }

    #[tokio::test]
    async fn test_list_collections_type_filters() {
        let (ctrl, _, subscriptions) = controller();
        subscriptions.seed_room("bar", "index");

        let stored = ctrl
            .list_collections(&request(Some("index"), json!({"type": "stored"})))
            .await
            .unwrap();
        assert_eq!(stored["type"], "stored");
        assert!(stored["collections"].get("realtime").is_none());

        let realtime = ctrl
            .list_collections(&request(Some("index"), json!({"type": "realtime"})))
            .await
            .unwrap();
        assert_eq!(realtime["type"], "realtime");
        assert!(realtime["collections"].get("stored").is_none());
        assert_eq!(realtime["collections"]["realtime"], json!(["bar"]));
    }

    #[tokio::test]
    async fn test_list_collections_rejects_unknown_type() {
        let (ctrl, _, _) = controller();
        let err = ctrl
            .list_collections(&request(Some("index"), json!({"type": "foo"})))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_collections_requires_an_index() {
        let (ctrl, _, _) = controller();
        let err = ctrl
            .list_collections(&request(None, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_now_resolves_to_a_number() {
        let (ctrl, _, _) = controller();
        let result = ctrl.now(&request(None, json!({}))).await.unwrap();
        assert!(result["now"].is_u64());
    }

    #[tokio::test]
    async fn test_server_info_shape() {
        let (ctrl, _, _) = controller();
        let result = ctrl.server_info(&request(None, json!({}))).await.unwrap();

        let info = &result["serverInfo"];
        assert!(info["gateway"]["version"].is_string());
        assert!(info["gateway"]["api"]["routes"]["read"].is_array());
        assert_eq!(info["services"]["storage"]["type"], "memory");
        assert_eq!(info["services"]["broker"]["type"], "embedded");
    }

    #[tokio::test]
    async fn test_server_info_fails_when_the_broker_status_fails() {
        struct FailingBroker;

        #[async_trait]
        impl Broker for FailingBroker {
            async fn listen_exchange(
                &self,
                _pattern: &str,
                _handler: BrokerHandler,
            ) -> Result<(), BrokerError> {
                Ok(())
            }
            async fn publish(&self, _key: &str, _payload: Value) -> Result<(), BrokerError> {
                Ok(())
            }
            async fn get_infos(&self) -> Result<Value, BrokerError> {
                Err(BrokerError::Backend("foobar".into()))
            }
        }

        let ctrl = ReadController::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(InMemorySubscriptions::new()),
            Arc::new(FailingBroker),
        );
        let err = ctrl.server_info(&request(None, json!({}))).await.unwrap_err();
        assert!(matches!(err, GatewayError::Collaborator { service: "broker", .. }));
    }

    #[tokio::test]
    async fn test_exists_checks_delegate_to_storage() {
        let (ctrl, storage, _) = controller();
        storage
            .create(&request(Some("library"), json!({"title": "x"})))
            .await
            .unwrap();

        let exists = ctrl
            .collection_exists(&request(Some("library"), json!({})))
            .await
            .unwrap();
        assert_eq!(exists, Value::Bool(true));

        let exists = ctrl
            .index_exists(&request(Some("nowhere"), json!({})))
            .await
            .unwrap();
        assert_eq!(exists, Value::Bool(false));
    }
}
