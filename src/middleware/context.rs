//! Caller-context middleware.
//!
//! Attaches a [`RequestContext`] to every inbound HTTP and WebSocket
//! request: a fresh connection id plus the bearer token when one is
//! supplied. The token is carried opaquely: validation belongs to an
//! external authority, not the dispatch core.

use axum::extract::Request as HttpRequest;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::request::RequestContext;

/// Build the caller context and store it in the request extensions.
pub async fn caller_context_middleware(mut request: HttpRequest, next: Next) -> Response {
    let token = extract_token(&request);
    if token.is_some() {
        debug!(path = %request.uri().path(), "caller supplied a bearer token");
    }
    request.extensions_mut().insert(RequestContext::new(token));
    next.run(request).await
}

/// Token sources, in priority order: `Authorization: Bearer <token>`
/// header, then a `?token=` query parameter for browser WebSocket
/// connections that cannot set headers.
fn extract_token(request: &HttpRequest) -> Option<String> {
    if let Some(header) = request.headers().get("authorization") {
        return header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);
    }

    request.uri().query().and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token=").map(str::to_owned))
    })
}
