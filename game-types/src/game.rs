use crate::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::player::{Player, PublicPlayer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Role {
    #[default]
    Civilian,
    Imposter,
    Spy,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Civilian => "civilian",
            Role::Imposter => "imposter",
            Role::Spy => "spy",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "civilian" => Ok(Role::Civilian),
            "imposter" => Ok(Role::Imposter),
            "spy" => Ok(Role::Spy),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Team declared the winner when a game resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Winner {
    Civilians,
    Imposters,
    Spy,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Civilians => "civilians",
            Winner::Imposters => "imposters",
            Winner::Spy => "spy",
        }
    }

    /// Whether a player holding `role` is on the winning side
    pub fn includes(&self, role: Role) -> bool {
        matches!(
            (self, role),
            (Winner::Civilians, Role::Civilian)
                | (Winner::Imposters, Role::Imposter)
                | (Winner::Spy, Role::Spy)
        )
    }
}

impl FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "civilians" => Ok(Winner::Civilians),
            "imposters" => Ok(Winner::Imposters),
            "spy" => Ok(Winner::Spy),
            other => Err(format!("unknown winner: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum GameMode {
    Local,   // Pass-the-device on a single screen
    Online,  // Replicated through a shared room
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum GamePhase {
    Setup,
    Names,
    OnlineLobby,
    RevealRoles,
    Playing,
    Voting,
    RevealEliminated,
    ImposterGuess,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordPair {
    pub word1: String,
    pub word2: String,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoteRecord {
    pub voter_id: PlayerId,
    pub voter_role: Role,
    pub target_id: PlayerId,
    pub target_role: Role,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EliminationRecord {
    pub player_id: PlayerId,
    pub role: Role,
    pub round: u32,
    pub voter_ids: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeoutRecord {
    pub player_id: PlayerId,
    pub round: u32,
}

/// Replication identity of the local participant.
/// `my_role` and `my_word` are only ever filled for this participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomIdentity {
    pub room_id: RoomId,
    pub room_code: String,
    pub is_host: bool,
    pub participant_ref: Uuid,
    pub player_id: PlayerId,
    pub my_role: Option<Role>,
    pub my_word: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameState {
    pub mode: GameMode,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub original_players: Vec<Player>,
    pub all_players_snapshot: Vec<Player>,
    pub player_count: u32,
    pub imposter_count: u32,
    pub spy_count: u32,
    pub round_duration: u32, // Seconds per talking turn, 0 disables the timer
    pub current_round: u32,
    pub current_player_index: usize,
    pub current_reveal_index: usize,
    pub player_turn_timer: u32,
    pub eliminated_player_id: Option<PlayerId>,
    pub civilian_word: String,
    pub spy_word: Option<String>,
    pub imposter_hint: String,
    pub vote_history: Vec<VoteRecord>,
    pub elimination_history: Vec<EliminationRecord>,
    pub timeout_history: Vec<TimeoutRecord>,
    pub winner: Option<Winner>,
    pub game_number: u32,
    pub room: Option<RoomIdentity>,
    pub revision: u32,
}

impl GameState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            phase: GamePhase::Setup,
            players: Vec::new(),
            original_players: Vec::new(),
            all_players_snapshot: Vec::new(),
            player_count: 0,
            imposter_count: 0,
            spy_count: 0,
            round_duration: 0,
            current_round: 0,
            current_player_index: 0,
            current_reveal_index: 0,
            player_turn_timer: 0,
            eliminated_player_id: None,
            civilian_word: String::new(),
            spy_word: None,
            imposter_hint: String::new(),
            vote_history: Vec::new(),
            elimination_history: Vec::new(),
            timeout_history: Vec::new(),
            winner: None,
            game_number: 0,
            room: None,
            revision: 0,
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.players.iter().filter(|p| p.role == role).count()
    }

    pub fn is_host(&self) -> bool {
        self.room.as_ref().is_some_and(|room| room.is_host)
    }
}

/// Public projection of `GameState` published by the host.
/// Per-player roles and words are stripped; the role-tagged roster and the
/// vote ledger (which carries voter/target roles) are only revealed once the
/// game reaches `Results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SharedState {
    pub phase: GamePhase,
    pub players: Vec<PublicPlayer>,
    pub player_count: u32,
    pub imposter_count: u32,
    pub spy_count: u32,
    pub round_duration: u32,
    pub current_round: u32,
    pub current_player_index: usize,
    pub current_reveal_index: usize,
    pub player_turn_timer: u32,
    pub eliminated_player_id: Option<PlayerId>,
    pub civilian_word: String,
    pub spy_word: Option<String>,
    pub imposter_hint: String,
    pub vote_history: Vec<VoteRecord>,
    pub elimination_history: Vec<EliminationRecord>,
    pub timeout_history: Vec<TimeoutRecord>,
    pub winner: Option<Winner>,
    pub game_number: u32,
    pub final_roster: Option<Vec<Player>>,
    pub revision: u32,
}

impl From<&GameState> for SharedState {
    fn from(state: &GameState) -> Self {
        let revealed = state.phase == GamePhase::Results;
        let final_roster = revealed.then(|| state.all_players_snapshot.clone());
        let vote_history = if revealed {
            state.vote_history.clone()
        } else {
            Vec::new()
        };

        SharedState {
            phase: state.phase,
            players: state.players.iter().map(PublicPlayer::from).collect(),
            player_count: state.player_count,
            imposter_count: state.imposter_count,
            spy_count: state.spy_count,
            round_duration: state.round_duration,
            current_round: state.current_round,
            current_player_index: state.current_player_index,
            current_reveal_index: state.current_reveal_index,
            player_turn_timer: state.player_turn_timer,
            eliminated_player_id: state.eliminated_player_id,
            civilian_word: state.civilian_word.clone(),
            spy_word: state.spy_word.clone(),
            imposter_hint: state.imposter_hint.clone(),
            vote_history,
            elimination_history: state.elimination_history.clone(),
            timeout_history: state.timeout_history.clone(),
            winner: state.winner,
            game_number: state.game_number,
            final_roster,
            revision: state.revision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerPointsBreakdown {
    pub player_id: PlayerId,
    pub name: String,
    pub role: Role,
    pub eliminated: bool,
    pub win_points: i32,
    pub vote_points: i32,
    pub survival_points: i32,
    pub timeout_points: i32,
    pub total: i32,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub role: Role,
    pub points: i32,
    pub eliminated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameResultRecord {
    pub room_id: RoomId,
    pub game_number: u32,
    pub winner: Winner,
    pub civilian_word: String,
    pub spy_word: Option<String>,
    pub imposter_hint: String,
    pub players: Vec<PlayerResult>,
    pub created_at: String, // ISO 8601 string
}
