use super::state::AppState;
use crate::session::{ChannelSink, ConnectionId, OutboundMessage};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// GET /ws
/// Upgrade to a WebSocket carrying one recognition session
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection: binary frames in, outbound messages out as JSON text
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::generate();
    let (sink, mut outbound) = ChannelSink::new(state.outbound_queue);
    let (mut ws_tx, mut ws_rx) = socket.split();

    if let Err(e) = state
        .registry
        .on_connect(connection_id.clone(), Arc::new(sink))
        .await
    {
        error!(connection_id = %connection_id, "Failed to start session: {:#}", e);

        let message = OutboundMessage::error(format!("{:#}", e));
        if let Ok(text) = serde_json::to_string(&message) {
            let _ = ws_tx.send(Message::Text(text)).await;
        }
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    // Writer task: forward outbound messages to the socket
    let writer_id = connection_id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(connection_id = %writer_id, "Failed to serialize outbound message: {}", e);
                    continue;
                }
            };

            if ws_tx.send(Message::Text(text)).await.is_err() {
                debug!(connection_id = %writer_id, "Socket closed while sending");
                break;
            }
        }
    });

    // Reader loop: forward audio frames to the session
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Binary(data))) => {
                    state.registry.on_audio(&connection_id, Bytes::from(data)).await;
                }
                Some(Ok(Message::Text(_))) => {
                    debug!(connection_id = %connection_id, "Ignoring text frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // axum answers pings itself
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, "Socket read error: {}", e);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    state.registry.on_disconnect(&connection_id).await;
    writer.abort();
}
