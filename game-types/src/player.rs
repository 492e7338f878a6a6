use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::PlayerId;
use crate::game::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub word: String,
    pub voted_for: Option<PlayerId>,
    pub votes: u32,
}

impl Player {
    /// A roster entry with no role or word assigned yet
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: Role::default(),
            word: String::new(),
            voted_for: None,
            votes: 0,
        }
    }

    pub fn reset_votes(&mut self) {
        self.votes = 0;
        self.voted_for = None;
    }
}

/// Player as seen by every participant in a shared room (no role, no word)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
    pub voted_for: Option<PlayerId>,
    pub votes: u32,
}

impl From<&Player> for PublicPlayer {
    fn from(player: &Player) -> Self {
        PublicPlayer {
            id: player.id,
            name: player.name.clone(),
            voted_for: player.voted_for,
            votes: player.votes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerHistoryEntry {
    pub name: String,
    pub civilian_wins: u32,
    pub imposter_wins: u32,
    pub spy_wins: u32,
    pub total_points: i32,
    pub games_played: u32,
}

impl PlayerHistoryEntry {
    pub fn total_wins(&self) -> u32 {
        self.civilian_wins + self.imposter_wins + self.spy_wins
    }
}
