//! Error types shared across the gateway.

pub mod gateway_error;

pub use gateway_error::{GatewayError, GatewayResult};
