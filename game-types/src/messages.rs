use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::RoomId;

/// What changed in a room; receivers re-fetch the affected rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoomChange {
    SharedState { revision: u32 },
    Participants,
    PrivateRole { participant_ref: Uuid },
    Vote { game_number: u32, round: u32 },
    GameResult { game_number: u32 },
    RoomDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Subscribe { room_id: RoomId },
    Unsubscribe,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    Subscribed { room_id: RoomId },
    Unsubscribed,
    RoomChanged { room_id: RoomId, change: RoomChange },
    HeartbeatAck,
    Error { message: String },
}
