use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error body returned by the room server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ApiError {
    RoomNotFound { room: String },
    ParticipantNotFound { participant_ref: String },
    RoleNotReady,
    InvalidRequest { message: String },
    InternalError { message: String },
}
