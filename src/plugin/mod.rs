//! Plugin hook pipeline.
//!
//! External plugins observe or veto controller actions through named
//! events fired by the funnel around every dispatch: a before-event fires
//! unconditionally ahead of the action, an after-event fires only once the
//! action has succeeded. The funnel, not this module, guarantees that
//! ordering and the abort semantics; this module only delivers one event
//! to the listeners subscribed to it.
//!
//! Listeners are registered before the gateway starts serving and the
//! listener table is immutable afterwards, so concurrent dispatches can
//! read it without synchronization.

pub mod builtin;
pub mod registry;

pub use registry::{HookRegistry, HookRegistryBuilder};

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::GatewayError;
use crate::request::{Request, Response};

/// Payload delivered to hook listeners.
///
/// Before-events carry the request about to be executed, after-events the
/// response about to be returned. Payloads are borrowed: listeners observe
/// or veto, they never mutate the in-flight request.
#[derive(Debug, Clone, Copy)]
pub enum HookPayload<'a> {
    /// The request an action is about to run for
    Request(&'a Request),
    /// The response a completed action produced
    Response(&'a Response),
}

impl<'a> HookPayload<'a> {
    /// The request, when this is a before-event payload.
    pub fn as_request(&self) -> Option<&'a Request> {
        match self {
            HookPayload::Request(request) => Some(request),
            HookPayload::Response(_) => None,
        }
    }

    /// The response, when this is an after-event payload.
    pub fn as_response(&self) -> Option<&'a Response> {
        match self {
            HookPayload::Request(_) => None,
            HookPayload::Response(response) => Some(response),
        }
    }
}

/// Rejection raised by a hook listener to abort the in-flight action.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookRejection(pub String);

/// A single plugin extension point.
#[async_trait]
pub trait HookListener: Send + Sync {
    /// Called once per event the listener is subscribed to.
    ///
    /// Returning an error rejects the event: the funnel aborts the action
    /// (before-event) or invalidates its result (after-event).
    async fn on_event(&self, event: &str, payload: HookPayload<'_>) -> Result<(), HookRejection>;
}

/// The extension-point mechanism the funnel invokes per action.
#[async_trait]
pub trait HookPipeline: Send + Sync {
    /// Deliver `event` to every subscribed listener, in registration
    /// order. The first rejection aborts delivery and is returned as a
    /// [`GatewayError::Hook`].
    async fn trigger(&self, event: &str, payload: HookPayload<'_>) -> Result<(), GatewayError>;
}
