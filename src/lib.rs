pub mod config;
pub mod controllers;
pub mod core;
pub mod errors;
pub mod funnel;
pub mod handlers;
pub mod middleware;
pub mod plugin;
pub mod request;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use errors::{GatewayError, GatewayResult};
pub use funnel::{Funnel, FunnelBuilder};
pub use request::{Request, RequestContext, RequestOverrides, Response};
pub use state::AppState;
