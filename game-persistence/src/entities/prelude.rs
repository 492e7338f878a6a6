pub use super::game_results::Entity as GameResults;
pub use super::private_roles::Entity as PrivateRoles;
pub use super::room_participants::Entity as RoomParticipants;
pub use super::rooms::Entity as Rooms;
pub use super::votes::Entity as Votes;
