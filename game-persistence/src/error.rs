use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("participant {participant_ref} not found in room {room_id}")]
    ParticipantNotFound { room_id: Uuid, participant_ref: Uuid },

    #[error("could not allocate a unique room code after {attempts} attempts")]
    RoomCodeExhausted { attempts: u32 },

    #[error("corrupted row: {0}")]
    CorruptedData(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
