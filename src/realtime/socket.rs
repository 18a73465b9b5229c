//! WebSocket endpoint (`GET /ws`) feeding the gateway.
//!
//! Per-connection lifecycle: Connecting -> Authenticated (after `setup`) ->
//! room member(s) -> Disconnected. The transport handshake itself grants
//! nothing; identity arrives with the `setup` event and rooms are joined
//! explicitly afterwards.
//!
//! Each connection runs a writer task draining its event queue into the
//! socket, while this task reads frames and hands them to the gateway. On
//! any terminal condition both halves are torn down and the gateway drops
//! every binding and membership for the handle.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::realtime::events::ClientEvent;
use crate::realtime::gateway::RealtimeGateway;
use crate::server::state::AppState;

/// `GET /ws` - upgrade to a realtime connection.
pub async fn handle_socket_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway.clone()))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<RealtimeGateway>) {
    let id = gateway.open_connection();
    tracing::info!("{id} connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Writer half: serialize queued server events onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {e}");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader half: parse client frames and relay them to the gateway.
    // Malformed frames are dropped without closing the connection.
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("{id} transport error: {e}");
                break;
            }
        };

        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => gateway.handle_event(id, &tx, event).await,
                Err(e) => {
                    tracing::debug!("{id} sent malformed frame, dropped: {e}");
                }
            },
            WsMessage::Close(_) => break,
            // Pings are answered by axum automatically; binary frames are
            // not part of the protocol.
            _ => {}
        }
    }

    gateway.disconnect(id);
    writer.abort();
    tracing::info!("{id} closed");
}
