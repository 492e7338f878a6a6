use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use game_persistence::RoomStore;
use game_types::{ClientMessage, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

pub mod handlers;
pub mod rate_limiter;


use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Serve one socket: subscribe it to `room_id` straight away, then forward
/// room changes out and client messages in until either side closes
pub async fn handle_connection(websocket: WebSocket, store: Arc<dyn RoomStore>, room_id: RoomId) {
    let connection_id = Uuid::new_v4();
    info!(connection = %connection_id, %room_id, "New WebSocket connection");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut handler = MessageHandler::new(connection_id, store, outgoing);

    let incoming = async {
        if handler.subscribe(room_id).await.is_err() {
            return;
        }

        let mut rate_limiter = RateLimiter::new();
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if let Err(e) = handle_message(msg, &mut rate_limiter, &mut handler).await {
                        error!(connection = %connection_id, "Error handling message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection = %connection_id, "WebSocket error: {}", e);
                    break;
                }
            }
        }
    };

    let outgoing = async {
        while let Some(message) = outgoing_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!(connection = %connection_id, "Failed to send message: {:?}", e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming => {},
        _ = outgoing => {},
    }

    info!(connection = %connection_id, "Connection closed");
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    handler: &mut MessageHandler,
) -> Result<(), String> {
    if !rate_limiter.check() {
        return Err("Rate limit exceeded".to_string());
    }

    if msg.is_close() {
        return Err("Client closed the connection".to_string());
    }
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;
    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return handler.send(ServerMessage::Error {
                message: format!("Invalid JSON message: {}", e),
            });
        }
    };

    handler.handle_message(client_message).await
}
