use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use anyhow::anyhow;
use axum::{Router, middleware, routing::get};
use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use pulse_gateway::core::broker::{Broker, EmbeddedBroker};
use pulse_gateway::core::realtime::InMemorySubscriptions;
use pulse_gateway::core::storage::InMemoryStorage;
use pulse_gateway::plugin::builtin::EventLogger;
use pulse_gateway::plugin::HookRegistryBuilder;
use pulse_gateway::{
    AppState, ServerConfig,
    controllers::build_funnel,
    handlers::{broker::bind_broker_listeners, http::health_check},
    middleware::caller_context_middleware,
    routes,
};

/// Pulse Gateway - Realtime data-access gateway
#[derive(Parser, Debug)]
#[command(name = "pulse-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        info!("loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    // Wire the collaborators and freeze the hook subscriptions
    let storage = Arc::new(InMemoryStorage::new());
    let subscriptions = Arc::new(InMemorySubscriptions::new());
    let broker: Arc<dyn Broker> = Arc::new(EmbeddedBroker::new());
    let hooks = HookRegistryBuilder::new()
        .on_any(Arc::new(EventLogger))
        .build();

    // Build the funnel; its registry is immutable from here on
    let funnel = Arc::new(build_funnel(
        storage,
        subscriptions,
        Arc::clone(&broker),
        Arc::new(hooks),
    ));

    // Bind the broker transport. A binding failure is startup-fatal.
    bind_broker_listeners(Arc::clone(&funnel), broker)
        .await
        .map_err(|e| anyhow!("broker listener setup failed: {e}"))?;

    let cors_origins = config.cors_allowed_origins.clone();
    let address = config.address();

    // Create application state
    let app_state = AppState::new(config, funnel);

    // API and channel routes both get the caller-context middleware
    let api_routes = routes::api::create_api_router()
        .layer(middleware::from_fn(caller_context_middleware));
    let ws_routes = routes::ws::create_channel_router()
        .layer(middleware::from_fn(caller_context_middleware));

    // Public health check route (no caller context needed)
    let public_routes = Router::new().route("/", get(health_check));

    // Configure CORS
    let cors_layer = match cors_origins.as_deref() {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        Some(origins) => {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        }
        // No CORS configured - same-origin only
        None => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
    };

    let app = public_routes
        .merge(api_routes)
        .merge(ws_routes)
        .with_state(app_state)
        .layer(cors_layer);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("server listening on http://{socket_addr}");
    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
