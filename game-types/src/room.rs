use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::game::Role;
use crate::{PlayerId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Participant {
    pub participant_ref: Uuid,
    pub room_id: RoomId,
    pub name: String,
    pub player_id: PlayerId,
    pub is_host: bool,
    pub pending_guess: Option<String>,
    pub joined_at: String, // ISO 8601 string
}

/// Role and word readable only by the participant they belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrivateRole {
    pub role: Role,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoteSubmission {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub game_number: u32,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoteEntry {
    pub id: i32,
    pub room_id: RoomId,
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub game_number: u32,
    pub round: u32,
    pub created_at: String, // ISO 8601 string
}

/// Saved on the device so a page reload can reconnect to the same room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResumeSession {
    pub room_id: RoomId,
    pub room_code: String,
    pub participant_name: String,
    pub participant_ref: Uuid,
    pub participant_player_ref: PlayerId,
    pub is_host: bool,
    pub timestamp: String, // ISO 8601 string
}
