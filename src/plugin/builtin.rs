//! Built-in hook listeners shipped with the gateway.

use async_trait::async_trait;
use tracing::debug;

use super::{HookListener, HookPayload, HookRejection};

/// Logs every funnel event at debug level.
///
/// Registered as a catch-all listener by the server binary so operators
/// get a trace of the hook protocol without any external plugin.
#[derive(Debug, Default)]
pub struct EventLogger;

#[async_trait]
impl HookListener for EventLogger {
    async fn on_event(&self, event: &str, payload: HookPayload<'_>) -> Result<(), HookRejection> {
        match payload {
            HookPayload::Request(request) => debug!(
                event = %event,
                controller = %request.controller(),
                action = request.action().unwrap_or("-"),
                "hook event"
            ),
            HookPayload::Response(response) => debug!(
                event = %event,
                status = response.status(),
                "hook event"
            ),
        }
        Ok(())
    }
}
