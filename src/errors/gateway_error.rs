//! Gateway error taxonomy.
//!
//! Every failure that can surface from a dispatch is one of four kinds:
//! malformed input (`Validation`), an unknown controller/action pairing
//! (`Routing`), a failure reported by an external collaborator
//! (`Collaborator`), or a hook rejection (`Hook`). `Internal` covers
//! startup wiring faults that are never produced by a live dispatch.
//!
//! Validation and routing failures are client errors; everything else maps
//! to a server error status. Collaborator messages are carried through
//! unchanged so callers see the originating failure.

use thiserror::Error;

use crate::core::broker::BrokerError;
use crate::core::realtime::SubscriptionError;
use crate::core::storage::StorageError;

/// Errors produced while dispatching a request through the funnel.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or out-of-range input
    #[error("{0}")]
    Validation(String),

    /// Unknown controller or action
    #[error("{0}")]
    Routing(String),

    /// Failure reported by an external collaborator, propagated unchanged
    #[error("{service} failure: {message}")]
    Collaborator {
        /// Collaborator that reported the failure
        service: &'static str,
        /// Original failure message
        message: String,
    },

    /// A before- or after-hook rejected the action
    #[error("hook '{event}' rejected the action: {message}")]
    Hook {
        /// Event name the rejecting listener was subscribed to
        event: String,
        /// Rejection message
        message: String,
    },

    /// Startup or wiring fault
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for funnel and controller operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// HTTP-style status code for this error.
    ///
    /// Validation and routing failures are the client's fault; collaborator
    /// and hook failures are surfaced as server errors.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Validation(_) | GatewayError::Routing(_) => 400,
            GatewayError::Collaborator { .. }
            | GatewayError::Hook { .. }
            | GatewayError::Internal(_) => 500,
        }
    }

    /// Stable kind label for programmatic handling on the client side.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "ValidationError",
            GatewayError::Routing(_) => "RoutingError",
            GatewayError::Collaborator { .. } => "CollaboratorError",
            GatewayError::Hook { .. } => "HookError",
            GatewayError::Internal(_) => "InternalError",
        }
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        GatewayError::Collaborator {
            service: "storage",
            message: err.to_string(),
        }
    }
}

impl From<SubscriptionError> for GatewayError {
    fn from(err: SubscriptionError) -> Self {
        GatewayError::Collaborator {
            service: "subscriptions",
            message: err.to_string(),
        }
    }
}

impl From<BrokerError> for GatewayError {
    fn from(err: BrokerError) -> Self {
        GatewayError::Collaborator {
            service: "broker",
            message: err.to_string(),
        }
    }
}
