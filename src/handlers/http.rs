//! Request/response (HTTP) listener.
//!
//! Each route fixes the controller and action, normalizes the payload and
//! awaits the funnel's response, encoded as `{"error": ..., "result": ...}`.
//! A missing or unparsable payload on a create-style route short-circuits
//! with a client error before the funnel is ever invoked.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{Value, json};
use tracing::debug;

use crate::request::{Request, RequestContext, RequestOverrides, Response};
use crate::state::AppState;

/// Public health check, served without authentication.
pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "OK", "version": env!("CARGO_PKG_VERSION")}))
}

/// `POST /api/{index}/{collection}/_create`: write/create.
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Path((index, collection)): Path<(String, String)>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    // Empty input never reaches the funnel: no hook may fire for it.
    let raw = match parse_json_body(&body) {
        Ok(Some(raw)) => raw,
        Ok(None) => return client_error("empty body"),
        Err(message) => return client_error(&message),
    };

    let request = Request::normalize(
        raw,
        "write",
        RequestOverrides::default()
            .index(index)
            .collection(collection)
            .action("create"),
        context,
    );
    encode(state.funnel.execute(request).await)
}

/// `POST /api/{index}/{collection}/_search`: read/search.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path((index, collection)): Path<(String, String)>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    query_action(state, index, collection, "search", context, body).await
}

/// `POST /api/{index}/{collection}/_count`: read/count.
pub async fn count(
    State(state): State<Arc<AppState>>,
    Path((index, collection)): Path<(String, String)>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    query_action(state, index, collection, "count", context, body).await
}

/// `GET /api/{index}/{collection}/{id}`: read/get.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path((index, collection, id)): Path<(String, String, String)>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    let request = Request::normalize(
        json!({"_id": id}),
        "read",
        RequestOverrides::default()
            .index(index)
            .collection(collection)
            .action("get"),
        context,
    );
    encode(state.funnel.execute(request).await)
}

/// `GET /api/{index}/{collection}/_exists`: read/collectionExists.
pub async fn collection_exists(
    State(state): State<Arc<AppState>>,
    Path((index, collection)): Path<(String, String)>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    let request = Request::normalize(
        json!({}),
        "read",
        RequestOverrides::default()
            .index(index)
            .collection(collection)
            .action("collectionExists"),
        context,
    );
    encode(state.funnel.execute(request).await)
}

/// `GET /api/{index}/_exists`: read/indexExists.
pub async fn index_exists(
    State(state): State<Arc<AppState>>,
    Path(index): Path<String>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    let request = Request::normalize(
        json!({}),
        "read",
        RequestOverrides::default().index(index).action("indexExists"),
        context,
    );
    encode(state.funnel.execute(request).await)
}

/// `GET /api/{index}/_listCollections?type=`: read/listCollections.
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    let raw = match params.get("type") {
        Some(view_type) => json!({"type": view_type}),
        None => json!({}),
    };
    let request = Request::normalize(
        raw,
        "read",
        RequestOverrides::default()
            .index(index)
            .action("listCollections"),
        context,
    );
    encode(state.funnel.execute(request).await)
}

/// `GET /api/_listIndexes`: read/listIndexes.
pub async fn list_indexes(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    metadata_action(state, "listIndexes", context).await
}

/// `GET /api/_now`: read/now.
pub async fn now(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    metadata_action(state, "now", context).await
}

/// `GET /api/_serverInfo`: read/serverInfo.
pub async fn server_info(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> (StatusCode, Json<Value>) {
    metadata_action(state, "serverInfo", context).await
}

async fn query_action(
    state: Arc<AppState>,
    index: String,
    collection: String,
    action: &str,
    context: RequestContext,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    // An empty body is a legal match-all query here, unlike on create.
    let raw = match parse_json_body(&body) {
        Ok(Some(raw)) => raw,
        Ok(None) => json!({}),
        Err(message) => return client_error(&message),
    };

    let request = Request::normalize(
        raw,
        "read",
        RequestOverrides::default()
            .index(index)
            .collection(collection)
            .action(action),
        context,
    );
    encode(state.funnel.execute(request).await)
}

async fn metadata_action(
    state: Arc<AppState>,
    action: &str,
    context: RequestContext,
) -> (StatusCode, Json<Value>) {
    let request = Request::normalize(
        json!({}),
        "read",
        RequestOverrides::default().action(action),
        context,
    );
    encode(state.funnel.execute(request).await)
}

fn parse_json_body(body: &Bytes) -> Result<Option<Value>, String> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| format!("malformed JSON body: {err}"))
}

fn client_error(message: &str) -> (StatusCode, Json<Value>) {
    debug!(reason = %message, "rejecting request before dispatch");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": message, "result": null})),
    )
}

fn encode(response: Response) -> (StatusCode, Json<Value>) {
    let status =
        StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.to_transport_payload()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_malformed_bodies_are_detected() {
        assert_eq!(parse_json_body(&Bytes::new()).unwrap(), None);
        assert_eq!(
            parse_json_body(&Bytes::from_static(b"{\"a\":1}")).unwrap(),
            Some(json!({"a": 1}))
        );
        assert!(parse_json_body(&Bytes::from_static(b"{not json")).is_err());
    }
}
