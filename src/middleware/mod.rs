//! HTTP middleware.

pub mod context;

pub use context::caller_context_middleware;
