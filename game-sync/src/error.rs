use game_core::SetupError;
use game_persistence::StoreError;
use game_types::RoomId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid setup: {0}")]
    Setup(#[from] SetupError),

    /// The host has not dealt this participant a role yet
    #[error("private role not ready after {attempts} attempts")]
    RoleNotReady { attempts: u32 },

    #[error("only the host can {action}")]
    NotHost { action: &'static str },

    #[error("only the imposter whose turn it is can guess")]
    NotGuesser,

    #[error("saved session no longer matches room {room_id}")]
    StaleSession { room_id: RoomId },

    #[error("room {0} was deleted")]
    RoomDeleted(RoomId),
}

pub type Result<T> = std::result::Result<T, SyncError>;
