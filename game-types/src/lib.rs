pub mod game;
pub mod messages;
pub mod player;
pub mod room;
pub mod errors;

pub type PlayerId = uuid::Uuid;
pub type RoomId = uuid::Uuid;

// Re-export all types
pub use game::*;
pub use messages::*;
pub use player::*;
pub use room::*;
pub use errors::*;
