//! Canonical response shape.
//!
//! Every funnel invocation yields exactly one [`Response`]. Exactly one of
//! `error` / `data` carries the materially meaningful result; both fields
//! are always present in the serialized form, the other as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::GatewayError;

/// Serialized form of a [`GatewayError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Human-readable failure message
    pub message: String,
    /// Stable error kind label
    pub kind: String,
    /// HTTP-style status code
    pub status: u16,
}

impl From<&GatewayError> for ErrorDescriptor {
    fn from(err: &GatewayError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind().to_string(),
            status: err.status(),
        }
    }
}

/// Successful action result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    /// Body produced by the controller action
    pub body: Value,
}

/// Canonical outcome of one dispatched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    status: u16,
    error: Option<ErrorDescriptor>,
    data: Option<ResponseData>,
}

impl Response {
    /// Successful response wrapping a controller action's result.
    pub fn success(body: Value) -> Self {
        Self {
            status: 200,
            error: None,
            data: Some(ResponseData { body }),
        }
    }

    /// Error response carrying the failure descriptor.
    pub fn from_error(error: GatewayError) -> Self {
        Self {
            status: error.status(),
            error: Some(ErrorDescriptor::from(&error)),
            data: None,
        }
    }

    /// HTTP-style status code of this outcome.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Failure descriptor, when the dispatch failed.
    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref()
    }

    /// Successful result, when the dispatch succeeded.
    pub fn data(&self) -> Option<&ResponseData> {
        self.data.as_ref()
    }

    /// Encoding sent to request/response callers: `{"error": ..., "result": ...}`.
    pub fn to_transport_payload(&self) -> Value {
        json!({
            "error": &self.error,
            "result": self.data.as_ref().map(|d| &d.body),
        })
    }
}

impl From<GatewayError> for Response {
    fn from(error: GatewayError) -> Self {
        Self::from_error(error)
    }
}
