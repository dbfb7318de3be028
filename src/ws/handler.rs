use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::metrics::{
    self, BROADCAST_DELIVERED_TOTAL, SEND_FAILURES_TOTAL, WS_CONNECTIONS_CLOSED,
    WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION,
};
use crate::registry::ConnectionHandle;
use crate::server::WsState;

use super::message::{decode_inbound, ClientMessage, Inbound, ServerMessage};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// WebSocket upgrade handler
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
#[tracing::instrument(name = "ws.connection", skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: WsState) {
    let connection_start = std::time::Instant::now();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CHANNEL_BUFFER_SIZE);

    let handle = match state.registry.register(tx).await {
        Some(h) => h,
        // Peer vanished during the handshake; nothing to clean up
        None => return,
    };
    let connection_id = handle.id;

    WS_CONNECTIONS_OPENED.inc();
    tracing::info!(connection_id, "WebSocket connection established");

    // Split socket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Task for receiving messages from WebSocket
    let state_clone = state.clone();
    let handle_clone = handle.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &handle_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = handle_clone.id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {
            tracing::debug!(connection_id, "Send task completed");
        }
        _ = recv_task => {
            tracing::debug!(connection_id, "Receive task completed");
        }
    }

    // Unregister connection (idempotent if a failed send already did)
    state.registry.unregister(connection_id).await;

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(connection_id, duration_secs = duration, "WebSocket connection closed");
}

/// Process a received WebSocket message
/// Returns false if the connection should be closed
async fn process_message(msg: Message, state: &WsState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        Message::Text(text) => {
            dispatch_text(text.as_str(), state, handle).await;
            true
        }
        Message::Binary(data) => {
            metrics::record_message("binary");
            let ack = ServerMessage::ack_json(&format!("binary frame ({} bytes)", data.len()));
            state.registry.send_to(handle.id, ack).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = handle.id, "Received close frame");
            false
        }
    }
}

/// Dispatch a text frame to its reply.
///
/// Total over all inputs: recognized commands get their typed reply,
/// unrecognized JSON and non-JSON payloads get generic acknowledgements.
#[tracing::instrument(name = "ws.message", skip(text, state, handle), fields(connection_id = handle.id))]
async fn dispatch_text(text: &str, state: &WsState, handle: &Arc<ConnectionHandle>) {
    match decode_inbound(text) {
        Inbound::Command(ClientMessage::Ping { message }) => {
            metrics::record_message("ping");
            state.registry.send_to(handle.id, ServerMessage::pong(message)).await;
        }
        Inbound::Command(ClientMessage::Echo { message }) => {
            metrics::record_message("echo");
            state.registry.send_to(handle.id, ServerMessage::echo(&message)).await;
        }
        Inbound::Command(ClientMessage::Broadcast { message }) => {
            metrics::record_message("broadcast");
            let payload = ServerMessage::broadcast_from(handle.id, &message);
            let outcome = state.registry.broadcast(payload).await;
            BROADCAST_DELIVERED_TOTAL.inc_by(outcome.delivered as u64);
            SEND_FAILURES_TOTAL.inc_by(outcome.pruned as u64);
            tracing::debug!(
                sender = handle.id,
                attempted = outcome.attempted,
                delivered = outcome.delivered,
                pruned = outcome.pruned,
                "Broadcast completed"
            );
        }
        Inbound::UnknownJson => {
            metrics::record_message("message");
            state.registry.send_to(handle.id, ServerMessage::ack_json(text)).await;
        }
        Inbound::NotJson => {
            metrics::record_message("text");
            state.registry.send_to(handle.id, ServerMessage::ack_text(text)).await;
        }
    }
}
