//! Shared fixtures for the integration tests.

// Each test binary compiles this module independently and uses a
// different subset of it.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;

use pulse_gateway::AppState;
use pulse_gateway::ServerConfig;
use pulse_gateway::controllers::build_funnel;
use pulse_gateway::core::broker::EmbeddedBroker;
use pulse_gateway::core::realtime::InMemorySubscriptions;
use pulse_gateway::core::storage::{InMemoryStorage, StorageEngine};
use pulse_gateway::errors::GatewayError;
use pulse_gateway::middleware::caller_context_middleware;
use pulse_gateway::plugin::{HookPayload, HookPipeline};
use pulse_gateway::routes;

/// Hook pipeline recording every event name it receives.
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl HookPipeline for RecordingHooks {
    async fn trigger(&self, event: &str, _payload: HookPayload<'_>) -> Result<(), GatewayError> {
        self.events.lock().push(event.to_string());
        Ok(())
    }
}

/// A fully wired gateway over in-memory collaborators.
pub struct TestGateway {
    pub state: Arc<AppState>,
    pub hooks: Arc<RecordingHooks>,
    pub storage: Arc<InMemoryStorage>,
    pub subscriptions: Arc<InMemorySubscriptions>,
    pub broker: Arc<EmbeddedBroker>,
}

impl TestGateway {
    pub fn new() -> Self {
        let hooks = Arc::new(RecordingHooks::default());
        let storage = Arc::new(InMemoryStorage::new());
        let subscriptions = Arc::new(InMemorySubscriptions::new());
        let broker = Arc::new(EmbeddedBroker::new());

        let funnel = build_funnel(
            Arc::clone(&storage) as Arc<dyn StorageEngine>,
            Arc::clone(&subscriptions) as Arc<dyn pulse_gateway::core::SubscriptionRegistry>,
            Arc::clone(&broker) as Arc<dyn pulse_gateway::core::Broker>,
            Arc::clone(&hooks) as Arc<dyn HookPipeline>,
        );

        Self {
            state: AppState::new(ServerConfig::default(), Arc::new(funnel)),
            hooks,
            storage,
            subscriptions,
            broker,
        }
    }

    /// The API router as served by the binary, caller-context middleware
    /// included.
    pub fn router(&self) -> Router {
        routes::api::create_api_router()
            .layer(axum::middleware::from_fn(caller_context_middleware))
            .with_state(Arc::clone(&self.state))
    }
}
