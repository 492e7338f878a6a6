use std::sync::Arc;

use game_persistence::RoomStore;
use game_types::{ClientMessage, RoomChange, RoomId, ServerMessage};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-connection state: at most one room subscription, forwarded by a
/// spawned task into the connection's outgoing queue
pub struct MessageHandler {
    connection_id: Uuid,
    store: Arc<dyn RoomStore>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    subscription: Option<(RoomId, JoinHandle<()>)>,
}

impl MessageHandler {
    pub fn new(
        connection_id: Uuid,
        store: Arc<dyn RoomStore>,
        outgoing: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            connection_id,
            store,
            outgoing,
            subscription: None,
        }
    }

    pub fn subscribed_room(&self) -> Option<RoomId> {
        self.subscription.as_ref().map(|(room_id, _)| *room_id)
    }

    pub async fn handle_message(&mut self, message: ClientMessage) -> Result<(), String> {
        match message {
            ClientMessage::Subscribe { room_id } => self.subscribe(room_id).await,
            ClientMessage::Unsubscribe => {
                self.unsubscribe();
                self.send(ServerMessage::Unsubscribed)
            }
            ClientMessage::Heartbeat => self.send(ServerMessage::HeartbeatAck),
        }
    }

    /// Switch this connection to `room_id`. Unknown rooms get an error
    /// message and keep the current subscription.
    pub async fn subscribe(&mut self, room_id: RoomId) -> Result<(), String> {
        if let Err(e) = self.store.list_participants(room_id).await {
            warn!(connection = %self.connection_id, %room_id, error = %e, "Subscribe rejected");
            return self.send(ServerMessage::Error {
                message: e.to_string(),
            });
        }

        self.unsubscribe();
        let mut changes = self.store.subscribe(room_id);
        let outgoing = self.outgoing.clone();
        let connection_id = self.connection_id;

        let forwarder = tokio::spawn(async move {
            loop {
                let message = match changes.recv().await {
                    Ok(change) => ServerMessage::RoomChanged { room_id, change },
                    Err(RecvError::Lagged(skipped)) => ServerMessage::Error {
                        message: format!("missed {} room changes, resync required", skipped),
                    },
                    Err(RecvError::Closed) => break,
                };

                let deleted = matches!(
                    message,
                    ServerMessage::RoomChanged {
                        change: RoomChange::RoomDeleted,
                        ..
                    }
                );
                if outgoing.send(message).is_err() || deleted {
                    break;
                }
            }
            debug!(connection = %connection_id, %room_id, "Room forwarding stopped");
        });

        self.subscription = Some((room_id, forwarder));
        info!(connection = %self.connection_id, %room_id, "Subscribed to room");
        self.send(ServerMessage::Subscribed { room_id })
    }

    pub fn unsubscribe(&mut self) {
        if let Some((room_id, forwarder)) = self.subscription.take() {
            forwarder.abort();
            debug!(connection = %self.connection_id, %room_id, "Unsubscribed from room");
        }
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), String> {
        self.outgoing
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }
}

impl Drop for MessageHandler {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
