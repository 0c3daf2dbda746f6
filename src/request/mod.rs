//! Canonical request representation and normalization.
//!
//! Every transport funnels its inbound payloads through
//! [`Request::normalize`] so the rest of the gateway only ever sees one
//! request shape. Normalization is a pure, infallible constructor: absence
//! of a required field is a funnel-time or controller-time concern, never a
//! normalization-time one.
//!
//! # Body wrapping
//!
//! A payload that does not already carry a `content` wrapper is wrapped as
//! `{"content": <original payload>}` before metadata is attached, so every
//! downstream consumer can uniformly read `body.content` regardless of the
//! transport the payload arrived on.

pub mod response;

pub use response::{ErrorDescriptor, Response, ResponseData};

use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// Key that marks an already-wrapped payload.
const CONTENT_KEY: &str = "content";

/// Caller identity attached to every request.
///
/// Opaque to the funnel; controllers and collaborators read what they need.
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    /// Identifier of the transport connection this request arrived on
    pub connection_id: String,
    /// Bearer token supplied by the caller, if any; never validated here
    pub token: Option<String>,
}

impl RequestContext {
    /// Context for a fresh connection, with a generated connection id.
    pub fn new(token: Option<String>) -> Self {
        Self {
            connection_id: Uuid::new_v4().to_string(),
            token,
        }
    }

    /// Anonymous context for transports that carry no caller identity.
    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

/// Positional metadata supplied by a transport alongside the raw payload.
///
/// Transports that encode routing metadata outside the body (route path,
/// routing-key segments) pass it here; any field supplied takes precedence
/// over a same-named field inside the payload.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    index: Option<String>,
    collection: Option<String>,
    action: Option<String>,
}

impl RequestOverrides {
    /// Override the target index.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Override the target collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Override the action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Canonical unit of work, immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    controller: String,
    collection: Option<String>,
    action: Option<String>,
    index: Option<String>,
    body: Value,
    context: RequestContext,
}

impl Request {
    /// Normalize a raw transport payload into a canonical request.
    ///
    /// The controller is mandatory and always transport-supplied; it is
    /// never inferred from the payload. If the payload is an object that
    /// already carries a `content` wrapper, its sibling `index`,
    /// `collection` and `action` fields are read as metadata; otherwise the
    /// whole payload becomes the content and carries no metadata. Overrides
    /// win over body-carried metadata.
    pub fn normalize(
        raw: Value,
        controller: impl Into<String>,
        overrides: RequestOverrides,
        context: RequestContext,
    ) -> Self {
        let (body, index, collection, action) = match raw {
            Value::Object(map) if map.contains_key(CONTENT_KEY) => {
                let index = string_field(&map, "index");
                let collection = string_field(&map, "collection");
                let action = string_field(&map, "action");
                (Value::Object(map), index, collection, action)
            }
            other => (json!({ CONTENT_KEY: other }), None, None, None),
        };

        Self {
            controller: controller.into(),
            index: overrides.index.or(index),
            collection: overrides.collection.or(collection),
            action: overrides.action.or(action),
            body,
            context,
        }
    }

    /// Controller this request routes to. Always non-empty.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Target collection, when the action is collection-scoped.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Action name, when already resolved by the transport.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Target index, when the action is index-scoped.
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Full normalized body, always of the shape `{"content": ...}`.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The content carried by the body wrapper.
    pub fn content(&self) -> &Value {
        &self.body[CONTENT_KEY]
    }

    /// Caller identity.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_owned)
}
