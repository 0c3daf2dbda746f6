//! Hook listener registry.
//!
//! Built once at startup through [`HookRegistryBuilder`], then frozen: the
//! registry exposes no mutation API, so the funnel can share it by
//! reference across concurrently scheduled dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{HookListener, HookPayload, HookPipeline};
use crate::errors::GatewayError;

/// Subscription key for listeners that receive every event.
const ANY_EVENT: &str = "*";

/// Builder collecting listener subscriptions before the serving phase.
#[derive(Default)]
pub struct HookRegistryBuilder {
    listeners: HashMap<String, Vec<Arc<dyn HookListener>>>,
}

impl HookRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to one named event.
    pub fn on(mut self, event: impl Into<String>, listener: Arc<dyn HookListener>) -> Self {
        self.listeners.entry(event.into()).or_default().push(listener);
        self
    }

    /// Subscribe a listener to every event the funnel fires.
    pub fn on_any(self, listener: Arc<dyn HookListener>) -> Self {
        self.on(ANY_EVENT, listener)
    }

    /// Freeze the subscriptions into an immutable registry.
    pub fn build(self) -> HookRegistry {
        HookRegistry {
            listeners: self.listeners,
        }
    }
}

/// Immutable listener table consulted by the funnel on every dispatch.
pub struct HookRegistry {
    listeners: HashMap<String, Vec<Arc<dyn HookListener>>>,
}

impl HookRegistry {
    /// Registry with no subscriptions; every trigger is a no-op success.
    pub fn empty() -> Self {
        HookRegistryBuilder::new().build()
    }
}

#[async_trait]
impl HookPipeline for HookRegistry {
    async fn trigger(&self, event: &str, payload: HookPayload<'_>) -> Result<(), GatewayError> {
        // Catch-all listeners run first, then exact subscribers, each in
        // registration order. The first rejection wins.
        for key in [ANY_EVENT, event] {
            let Some(listeners) = self.listeners.get(key) else {
                continue;
            };
            for listener in listeners {
                if let Err(rejection) = listener.on_event(event, payload).await {
                    debug!(event = %event, reason = %rejection, "hook listener rejected the event");
                    return Err(GatewayError::Hook {
                        event: event.to_string(),
                        message: rejection.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
