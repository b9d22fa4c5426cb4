//! WebSocket Support
//!
//! Real-time fanout subscriptions. The upgrade handshake authenticates with
//! the same API key mechanism as REST (the `x-app-api-key` header or the
//! `api_key` query parameter) and binds the connection to the resolved
//! tenant. Delivery frames are the JSON fanout events produced by the
//! pipeline.
//!
//! Keepalive: the server pings on the configured interval; a connection
//! that has not answered the previous ping by the next tick is terminated
//! and removed from the registry.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::APP_API_KEY_HEADER;
use crate::state::AppState;

/// Upgrade query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// API key as a query parameter, for clients that cannot set headers.
    pub api_key: Option<String>,
}

/// `GET /ws` — authenticate and upgrade to a fanout subscription.
pub async fn ws_subscriber_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let key = headers
        .get(APP_API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.api_key)
        .ok_or_else(|| ApiError::unauthorized("missing API key"))?;

    let app = state.keys.verify(&key).await?;
    let app_id = app.id;

    tracing::info!(app_id = %app_id, "WebSocket subscriber authenticated");
    Ok(ws.on_upgrade(move |socket| handle_subscriber_socket(socket, state, app_id)))
}

/// Drive one subscriber connection until it closes or fails keepalive.
async fn handle_subscriber_socket(socket: WebSocket, state: Arc<AppState>, app_id: Uuid) {
    let registry = state.fanout.registry();
    let (subscription, mut frames) = registry.subscribe(app_id);
    let (mut sender, mut receiver) = socket.split();

    let connected = json!({ "event": "connected", "app_id": app_id }).to_string();
    if sender.send(Message::Text(connected)).await.is_err() {
        registry.unsubscribe(subscription);
        return;
    }

    let mut keepalive = tokio::time::interval(state.fanout.ping_interval());
    // The first tick completes immediately; skip it so the first ping waits
    // a full interval.
    keepalive.tick().await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Client text/binary frames are ignored; filtering
                        // is the subscriber's responsibility.
                    }
                    Some(Err(_)) => break,
                }
            }
            _ = keepalive.tick() => {
                if awaiting_pong {
                    tracing::info!(app_id = %app_id, "Subscriber missed keepalive; disconnecting");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }
        }
    }

    registry.unsubscribe(subscription);
    tracing::info!(app_id = %app_id, "WebSocket subscriber disconnected");
}
