//! End-to-end tests for the request/response transport.
//!
//! Drive the API router the way the binary serves it and verify the
//! canonical `{"error": ..., "result": ...}` surface, the pre-dispatch
//! guards and the hook protocol around every dispatched action.

mod mocks;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pulse_gateway::core::storage::StorageEngine;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use mocks::TestGateway;

async fn send(
    gateway: &TestGateway,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).unwrap();

    let response = gateway.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    (status, payload)
}

#[tokio::test]
async fn test_create_with_empty_body_never_reaches_the_funnel() {
    let gateway = TestGateway::new();
    let (status, payload) = send(&gateway, "POST", "/api/library/books/_create", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"], "empty body");
    assert_eq!(payload["result"], Value::Null);
    assert!(gateway.hooks.events().is_empty(), "hooks must not fire");
}

#[tokio::test]
async fn test_create_with_malformed_body_never_reaches_the_funnel() {
    let gateway = TestGateway::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/library/books/_create")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = gateway.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.hooks.events().is_empty());
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let gateway = TestGateway::new();

    let (status, payload) = send(
        &gateway,
        "POST",
        "/api/library/books/_create",
        Some(json!({"title": "Dune"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["error"], Value::Null);
    let id = payload["result"]["_id"].as_str().unwrap().to_string();

    let (status, payload) = send(
        &gateway,
        "GET",
        &format!("/api/library/books/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["result"]["_source"]["title"], "Dune");

    let collections = gateway.storage.list_collections("library").await.unwrap();
    assert!(collections.contains("books"));

    assert_eq!(
        gateway.hooks.events(),
        vec![
            "data:beforeCreate",
            "data:afterCreate",
            "data:beforeGet",
            "data:afterGet",
        ]
    );
}

#[tokio::test]
async fn test_search_and_count_with_and_without_filters() {
    let gateway = TestGateway::new();
    for (title, genre) in [("Dune", "scifi"), ("Fargo", "crime")] {
        send(
            &gateway,
            "POST",
            "/api/library/books/_create",
            Some(json!({"title": title, "genre": genre})),
        )
        .await;
    }

    let (_, payload) = send(
        &gateway,
        "POST",
        "/api/library/books/_search",
        Some(json!({"query": {"genre": "scifi"}})),
    )
    .await;
    assert_eq!(payload["result"]["total"], 1);
    assert_eq!(payload["result"]["hits"][0]["_source"]["title"], "Dune");

    // An empty body is a match-all query, not a client error.
    let (status, payload) = send(&gateway, "POST", "/api/library/books/_count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["result"]["count"], 2);
}

#[tokio::test]
async fn test_get_unknown_document_surfaces_the_collaborator_error() {
    let gateway = TestGateway::new();
    let (status, payload) = send(&gateway, "GET", "/api/library/books/missing", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(payload["error"]["kind"], "CollaboratorError");
    assert!(
        payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing")
    );
    // The action failed inside the handler: before fired, after did not.
    assert_eq!(gateway.hooks.events(), vec!["data:beforeGet"]);
}

#[tokio::test]
async fn test_list_collections_merges_stored_and_realtime_views() {
    let gateway = TestGateway::new();
    send(
        &gateway,
        "POST",
        "/api/index/foo/_create",
        Some(json!({"title": "x"})),
    )
    .await;
    gateway.subscriptions.seed_room("foo", "index");
    gateway.subscriptions.seed_room("bar", "index");
    gateway.subscriptions.seed_room("baz", "wrong");

    let (status, payload) = send(&gateway, "GET", "/api/index/_listCollections", None).await;
    assert_eq!(status, StatusCode::OK);
    let view = &payload["result"];
    assert_eq!(view["type"], "all");
    assert_eq!(view["collections"]["stored"], json!(["foo"]));
    assert_eq!(view["collections"]["realtime"], json!(["bar", "foo"]));

    let (_, payload) = send(
        &gateway,
        "GET",
        "/api/index/_listCollections?type=realtime",
        None,
    )
    .await;
    assert_eq!(payload["result"]["type"], "realtime");
    assert!(payload["result"]["collections"].get("stored").is_none());
}

#[tokio::test]
async fn test_list_collections_rejects_an_unknown_type() {
    let gateway = TestGateway::new();
    let (status, payload) = send(
        &gateway,
        "GET",
        "/api/index/_listCollections?type=bogus",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"]["kind"], "ValidationError");
    assert_eq!(payload["result"], Value::Null);
}

#[tokio::test]
async fn test_exists_and_index_endpoints() {
    let gateway = TestGateway::new();
    send(
        &gateway,
        "POST",
        "/api/library/books/_create",
        Some(json!({"title": "x"})),
    )
    .await;

    let (_, payload) = send(&gateway, "GET", "/api/library/books/_exists", None).await;
    assert_eq!(payload["result"], true);

    let (_, payload) = send(&gateway, "GET", "/api/library/_exists", None).await;
    assert_eq!(payload["result"], true);

    let (_, payload) = send(&gateway, "GET", "/api/nowhere/_exists", None).await;
    assert_eq!(payload["result"], false);

    let (_, payload) = send(&gateway, "GET", "/api/_listIndexes", None).await;
    assert_eq!(payload["result"]["indexes"], json!(["library"]));
}

#[tokio::test]
async fn test_now_and_server_info() {
    let gateway = TestGateway::new();

    let (status, payload) = send(&gateway, "GET", "/api/_now", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(payload["result"]["now"].is_u64());

    let (status, payload) = send(&gateway, "GET", "/api/_serverInfo", None).await;
    assert_eq!(status, StatusCode::OK);
    let info = &payload["result"]["serverInfo"];
    assert!(info["gateway"]["version"].is_string());
    assert!(info["gateway"]["api"]["routes"]["read"].is_array());
    assert_eq!(info["services"]["storage"]["type"], "memory");
    assert_eq!(info["services"]["broker"]["type"], "embedded");
}

#[tokio::test]
async fn test_broker_and_http_transports_share_one_funnel() {
    let gateway = TestGateway::new();
    pulse_gateway::handlers::broker::bind_broker_listeners(
        std::sync::Arc::clone(&gateway.state.funnel),
        std::sync::Arc::clone(&gateway.broker) as std::sync::Arc<dyn pulse_gateway::core::Broker>,
    )
    .await
    .unwrap();

    use pulse_gateway::core::Broker;
    gateway
        .broker
        .publish(
            "write.books.create",
            json!({"content": {"title": "Dune"}, "index": "library"}),
        )
        .await
        .unwrap();

    // The broker transport is fire-and-forget; poll until the document
    // lands, then read it back over HTTP.
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);
    loop {
        let (_, payload) = send(&gateway, "POST", "/api/library/books/_count", None).await;
        if payload["result"]["count"] == 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "broker-published document never became visible over HTTP"
        );
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }
}
