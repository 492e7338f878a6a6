pub mod prelude;

pub mod game_results;
pub mod private_roles;
pub mod room_participants;
pub mod rooms;
pub mod votes;
