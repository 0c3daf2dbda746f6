//! Execution funnel.
//!
//! The funnel is the single dispatcher every transport feeds into. It
//! resolves a normalized request to a registered controller action, fires
//! the before-hook, invokes the action, fires the after-hook on success,
//! and converts every outcome into exactly one canonical [`Response`];
//! nothing is ever thrown past the funnel boundary.
//!
//! The `(controller, action)` registry is built once at startup through
//! [`FunnelBuilder`] and is read-only afterwards, so concurrently
//! scheduled dispatches share it without synchronization and one
//! dispatch's failure can never corrupt state observed by the next.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{GatewayError, GatewayResult};
use crate::plugin::{HookPayload, HookPipeline};
use crate::request::{Request, Response};

/// Future returned by a controller action.
pub type ActionFuture = Pin<Box<dyn Future<Output = GatewayResult<Value>> + Send>>;

/// A registered controller action.
pub type ActionHandler = Box<dyn Fn(Request) -> ActionFuture + Send + Sync>;

struct ActionEntry {
    before_event: String,
    after_event: String,
    handler: ActionHandler,
}

/// Collects action registrations before the serving phase.
#[derive(Default)]
pub struct FunnelBuilder {
    routes: HashMap<String, HashMap<String, ActionEntry>>,
}

impl FunnelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one action under `controller`, firing hook events in the
    /// given `domain` (`<domain>:before<Action>` / `<domain>:after<Action>`).
    pub fn action(
        &mut self,
        controller: &str,
        domain: &str,
        action: &str,
        handler: impl Fn(Request) -> ActionFuture + Send + Sync + 'static,
    ) -> &mut Self {
        let pascal = pascal_case(action);
        self.routes
            .entry(controller.to_string())
            .or_default()
            .insert(
                action.to_string(),
                ActionEntry {
                    before_event: format!("{domain}:before{pascal}"),
                    after_event: format!("{domain}:after{pascal}"),
                    handler: Box::new(handler),
                },
            );
        self
    }

    /// Freeze the registrations into an immutable funnel.
    pub fn build(self, hooks: Arc<dyn HookPipeline>) -> Funnel {
        Funnel {
            routes: self.routes,
            hooks,
        }
    }
}

/// The central dispatcher mapping normalized requests to controller
/// actions and enforcing the hook protocol around them.
pub struct Funnel {
    routes: HashMap<String, HashMap<String, ActionEntry>>,
    hooks: Arc<dyn HookPipeline>,
}

impl Funnel {
    /// Dispatch one request and produce its single canonical response.
    ///
    /// Ordering is strict for any one request: before-hook, then action,
    /// then after-hook. The before-hook fires unconditionally once the
    /// route resolves; the after-hook fires only when the action
    /// succeeded, and its own failure invalidates the action's result.
    pub async fn execute(&self, request: Request) -> Response {
        let entry = match self.resolve(&request) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    controller = %request.controller(),
                    action = request.action().unwrap_or("-"),
                    error = %err,
                    "request did not resolve to a registered action"
                );
                return Response::from_error(err);
            }
        };

        if let Err(err) = self
            .hooks
            .trigger(&entry.before_event, HookPayload::Request(&request))
            .await
        {
            return Response::from_error(err);
        }

        match (entry.handler)(request).await {
            Ok(body) => {
                let response = Response::success(body);
                match self
                    .hooks
                    .trigger(&entry.after_event, HookPayload::Response(&response))
                    .await
                {
                    Ok(()) => response,
                    // A failing after-hook invalidates the result: the
                    // handler's success is not returned.
                    Err(err) => Response::from_error(err),
                }
            }
            Err(err) => {
                debug!(error = %err, "controller action failed");
                Response::from_error(err)
            }
        }
    }

    /// Registered controller names, for transport listeners that bind one
    /// subscription per controller.
    pub fn controllers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `controller` has at least one registered action.
    pub fn has_controller(&self, controller: &str) -> bool {
        self.routes.contains_key(controller)
    }

    /// Controller-to-actions table, for route metadata endpoints.
    pub fn route_table(&self) -> BTreeMap<String, Vec<String>> {
        self.routes
            .iter()
            .map(|(controller, actions)| {
                let mut names: Vec<String> = actions.keys().cloned().collect();
                names.sort();
                (controller.clone(), names)
            })
            .collect()
    }

    fn resolve(&self, request: &Request) -> GatewayResult<&ActionEntry> {
        let actions = self.routes.get(request.controller()).ok_or_else(|| {
            GatewayError::Routing(format!("unknown controller '{}'", request.controller()))
        })?;
        let action = request
            .action()
            .ok_or_else(|| GatewayError::Routing("no action specified".to_string()))?;
        actions.get(action).ok_or_else(|| {
            GatewayError::Routing(format!(
                "unknown action '{}' for controller '{}'",
                action,
                request.controller()
            ))
        })
    }
}

/// Uppercase the first character, leaving the rest untouched
/// (`listCollections` becomes `ListCollections`).
fn pascal_case(action: &str) -> String {
    let mut chars = action.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
