pub mod change_feed;
pub mod connection;
pub mod entities;
pub mod error;
pub mod local_store;
pub mod repositories;
pub mod store;

pub use change_feed::ChangeFeed;
pub use connection::{connect_to_database, connect_to_memory_database};
pub use error::StoreError;
pub use local_store::LocalStore;
pub use repositories::DbRoomStore;
pub use store::RoomStore;
