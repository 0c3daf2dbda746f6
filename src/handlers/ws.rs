//! Channel (WebSocket) listener.
//!
//! A channel connection carries controller-named events: each text frame
//! is `{"event": "<controller>", "payload": <raw payload>}`. Frames for
//! unrecognized controllers are dropped with a warning and never reach
//! the funnel. Dispatch is fire-and-forget: no acknowledgement is sent
//! unless the dispatch fails and error replies are enabled in the
//! channel configuration.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response as HttpResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::request::{Request, RequestContext, RequestOverrides};
use crate::state::AppState;

/// Buffer size of the per-connection reply queue.
const REPLY_BUFFER_SIZE: usize = 64;

/// One inbound channel event.
#[derive(Debug, Deserialize)]
pub struct ChannelFrame {
    /// Controller name the client emitted the event under
    pub event: String,
    /// Raw payload, normalized before dispatch
    #[serde(default)]
    pub payload: Value,
}

/// `GET /ws`: upgrade to a persistent bidirectional channel.
pub async fn channel_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> HttpResponse {
    info!(connection_id = %context.connection_id, "channel connection upgrade requested");
    ws.on_upgrade(move |socket| handle_channel(socket, state, context))
}

async fn handle_channel(socket: WebSocket, state: Arc<AppState>, context: RequestContext) {
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(REPLY_BUFFER_SIZE);

    let sender_task = tokio::spawn(async move {
        while let Some(text) = reply_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatch_frame(text.as_str(), &state, &context, &reply_tx),
            Ok(Message::Close(_)) => break,
            // Binary frames and control frames carry no events.
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "channel transport error");
                break;
            }
        }
    }

    drop(reply_tx);
    let _ = sender_task.await;
    info!(connection_id = %context.connection_id, "channel connection closed");
}

/// Parse one frame and, when it names a recognized controller, dispatch
/// it asynchronously. The caller's receive loop never waits on a
/// dispatch.
pub(crate) fn dispatch_frame(
    text: &str,
    state: &Arc<AppState>,
    context: &RequestContext,
    reply_tx: &mpsc::Sender<String>,
) {
    let frame: ChannelFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "dropping malformed channel frame");
            return;
        }
    };
    if !state.funnel.has_controller(&frame.event) {
        warn!(event = %frame.event, "dropping frame for unrecognized controller");
        return;
    }

    let request = Request::normalize(
        frame.payload,
        &frame.event,
        RequestOverrides::default(),
        context.clone(),
    );
    let funnel = Arc::clone(&state.funnel);
    let error_replies = state.config.channel.error_replies;
    let reply_tx = reply_tx.clone();
    let event = frame.event;

    tokio::spawn(async move {
        let response = funnel.execute(request).await;
        let Some(descriptor) = response.error() else {
            return;
        };
        error!(event = %event, error = %descriptor.message, "channel dispatch failed");
        if !error_replies {
            return;
        }
        let reply = json!({"event": event, "error": descriptor, "result": null});
        match serde_json::to_string(&reply) {
            Ok(text) => {
                let _ = reply_tx.send(text).await;
            }
            Err(err) => error!(error = %err, "cannot serialize channel error reply"),
        }
    });
}
