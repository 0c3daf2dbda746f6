//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::funnel::Funnel;

/// State shared by every transport handler.
///
/// Both members are read-only during the request-serving phase: the
/// configuration is loaded once at startup and the funnel's registry is
/// frozen by its builder.
pub struct AppState {
    /// Gateway configuration
    pub config: ServerConfig,
    /// The dispatch funnel all transports feed into
    pub funnel: Arc<Funnel>,
}

impl AppState {
    pub fn new(config: ServerConfig, funnel: Arc<Funnel>) -> Arc<Self> {
        Arc::new(Self { config, funnel })
    }
}
