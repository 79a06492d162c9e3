use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{PairServer, RegisterClientError};

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<PairServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(64);

    let session_id = match server.register_client(tx, addr) {
        Ok(session_id) => session_id,
        Err(RegisterClientError::IpLimitExceeded) => {
            let error = ServerMessage::Error {
                message: "Too many connections from your address".to_string(),
                code: None,
            };
            if let Ok(text) = serde_json::to_string(&error) {
                let _ = sender.send(Message::Text(text.into())).await;
            }
            let _ = sender.close().await;
            return;
        }
    };

    // Drain the outbound channel onto the socket
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&*message) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to serialize outbound message");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let max_message_size = server.config().max_message_size;
    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "WebSocket error");
                break;
            }
        };

        match frame {
            Message::Text(text) => {
                if text.len() > max_message_size {
                    tracing::warn!(
                        session_id = %session_id,
                        size = text.len(),
                        max = max_message_size,
                        "Message exceeds size limit"
                    );
                    server.send_error(
                        &session_id,
                        format!(
                            "Message too large ({} bytes, max {} bytes)",
                            text.len(),
                            max_message_size
                        ),
                        Some(ErrorCode::MessageTooLarge),
                    );
                    continue;
                }

                let message: ClientMessage = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "Rejected malformed client frame"
                        );
                        server.send_error(
                            &session_id,
                            "Invalid message format".to_string(),
                            Some(ErrorCode::InvalidInput),
                        );
                        continue;
                    }
                };

                server.handle_client_message(&session_id, message).await;
            }
            Message::Close(_) => break,
            // Pings are answered by axum; binary and pong frames are ignored
            _ => {}
        }
    }

    send_task.abort();
    server.unregister_client(&session_id).await;
    tracing::info!(session_id = %session_id, "WebSocket connection closed");
}
