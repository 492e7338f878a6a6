//! Replicated play for online rooms.
//!
//! The host owns the authoritative `GameSession` and pushes a public
//! projection of it to the room store after every transition. Every other
//! device merges that projection with its own private role and writes only
//! votes and guesses back.

pub mod config;
pub mod error;
pub mod online;
pub mod replicator;
pub mod timer;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use online::OnlineGame;
pub use replicator::{ApplyOutcome, Replicator, apply_private_role, apply_shared_state, tally_votes};
pub use timer::{TimerEvent, TurnTimer};
