//! HTTP API router.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::http;
use crate::state::AppState;

/// Create the API router. Controller and action are fixed per route;
/// caller-context middleware is applied in `main.rs` once state exists.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/_now", get(http::now))
        .route("/api/_listIndexes", get(http::list_indexes))
        .route("/api/_serverInfo", get(http::server_info))
        .route("/api/{index}/_listCollections", get(http::list_collections))
        .route("/api/{index}/_exists", get(http::index_exists))
        .route("/api/{index}/{collection}/_exists", get(http::collection_exists))
        .route("/api/{index}/{collection}/_search", post(http::search))
        .route("/api/{index}/{collection}/_count", post(http::count))
        .route("/api/{index}/{collection}/_create", post(http::create_document))
        .route("/api/{index}/{collection}/{id}", get(http::get_document))
        .layer(TraceLayer::new_for_http())
}
