pub mod errors;
pub mod game_events;
pub mod game_state;
pub mod guess;
pub mod history;
pub mod roles;
pub mod scoring;
pub mod word_bank;

// Re-export main components
pub use errors::*;
pub use game_events::*;
pub use game_state::*;
pub use guess::*;
pub use history::*;
pub use roles::*;
pub use scoring::*;
pub use word_bank::*;
