//! Event-channel WebSocket handler.
//!
//! One shared broadcast topic: every connected client receives every event,
//! including events other clients published. There is no per-session
//! scoping; any redesign should make this per-session.

use std::sync::atomic::{AtomicI64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use vchat_models::EventMessage;

use crate::metrics;
use crate::state::AppState;

/// Global counter for active event-channel connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Event-channel endpoint.
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection();

    ws.on_upgrade(|socket| async move {
        handle_events_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Forward broadcast events to the client and rebroadcast client events.
async fn handle_events_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();

    info!("Event channel client connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let event_type = match &event {
                            EventMessage::ChatMessage { .. } => "chat message",
                            EventMessage::AnalysisResult { .. } => "analysis result",
                        };
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(_) => continue,
                        };

                        metrics::record_ws_event_sent(event_type);

                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event channel receiver lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        // Client-published events are rebroadcast verbatim to
                        // every connection, the publisher included.
                        match serde_json::from_str::<EventMessage>(&text) {
                            Ok(event) => state.broadcast(event),
                            Err(e) => debug!("Ignoring malformed client event: {e}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    info!("Event channel client disconnected");
}
