use std::collections::HashSet;

use game_types::{
    EliminationRecord, GameMode, GamePhase, GameResultRecord, GameState, Player, PlayerId,
    PlayerPointsBreakdown, PlayerResult, Role, RoomId, TimeoutRecord, VoteRecord, Winner,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::guess::guess_matches;
use crate::roles::{self, assign_roles};
use crate::scoring::{ScoringEngine, ScoringInput};
use crate::{GameEvent, GameEventBus, GameEventHandler, SetupError, WordBank};

/// Result of tallying the current round's votes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    NoVotes,
    Tie { votes: u32 },
    Eliminate { player_id: PlayerId, votes: u32 },
}

/// One step of the talking-turn countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Disarmed,
    Running(u32),
    Expired(PlayerId),
}

/// Owned state machine for one game session.
///
/// Every transition checks its own preconditions and is a no-op when they do
/// not hold, so callers can forward UI actions without pre-validating them.
pub struct GameSession {
    pub state: GameState,
    words: WordBank,
    rng: StdRng,
    event_bus: GameEventBus,
}

impl GameSession {
    pub fn new(mode: GameMode, words: WordBank) -> Self {
        Self::with_rng(mode, words, StdRng::from_entropy())
    }

    /// Deterministic shuffles, for tests and replays
    pub fn with_seed(mode: GameMode, words: WordBank, seed: u64) -> Self {
        Self::with_rng(mode, words, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: GameMode, words: WordBank, rng: StdRng) -> Self {
        Self {
            state: GameState::new(mode),
            words,
            rng,
            event_bus: GameEventBus::new(),
        }
    }

    /// Resume from a persisted snapshot
    pub fn from_state(state: GameState, words: WordBank) -> Self {
        Self {
            state,
            words,
            rng: StdRng::from_entropy(),
            event_bus: GameEventBus::new(),
        }
    }

    pub fn add_event_handler(&mut self, handler: Box<dyn GameEventHandler>) {
        self.event_bus.add_handler(handler);
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn max_imposters(&self) -> u32 {
        roles::max_imposters(self.state.player_count)
    }

    pub fn configure(
        &mut self,
        player_count: u32,
        imposter_count: u32,
        spy_count: u32,
        round_duration: u32,
    ) -> Result<(), SetupError> {
        self.require_phase(
            "configure",
            &[GamePhase::Setup, GamePhase::Names, GamePhase::OnlineLobby],
        )?;
        roles::validate_counts(player_count, imposter_count, spy_count)?;

        self.state.player_count = player_count;
        self.state.imposter_count = imposter_count;
        self.state.spy_count = spy_count;
        self.state.round_duration = round_duration;

        let next = match self.state.mode {
            GameMode::Local => GamePhase::Names,
            GameMode::Online => GamePhase::OnlineLobby,
        };
        self.set_phase(next);
        Ok(())
    }

    pub fn start_with_names<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), SetupError> {
        let players: Vec<Player> = names
            .iter()
            .map(|name| Player::new(Uuid::new_v4(), name.as_ref().trim()))
            .collect();
        self.start_with_roster(players)
    }

    /// Validate the roster, remember it as the original identities and deal
    /// the first assignment
    pub fn start_with_roster(&mut self, players: Vec<Player>) -> Result<(), SetupError> {
        self.require_phase("start", &[GamePhase::Names, GamePhase::OnlineLobby])?;

        let actual = players.len() as u32;
        if actual != self.state.player_count {
            return Err(SetupError::RosterSizeMismatch {
                expected: self.state.player_count,
                actual,
            });
        }

        let mut seen = HashSet::new();
        for player in &players {
            let name = player.name.trim();
            if name.is_empty() {
                return Err(SetupError::EmptyName);
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(SetupError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        self.state.original_players = players
            .into_iter()
            .map(|p| Player::new(p.id, p.name.trim()))
            .collect();
        self.deal();
        Ok(())
    }

    pub fn reset_to_reveal_roles(&mut self) {
        if self.state.original_players.is_empty()
            || matches!(
                self.state.phase,
                GamePhase::Setup | GamePhase::Names | GamePhase::OnlineLobby
            )
        {
            return;
        }
        self.deal();
    }

    pub fn play_again(&mut self) {
        self.reset_to_reveal_roles();
    }

    /// Back to setup with a fresh roster. The room identity, game counter and
    /// publish revision survive so results stay keyed uniquely per room.
    pub fn reset_game(&mut self) {
        let mut fresh = GameState::new(self.state.mode);
        fresh.room = self.state.room.take();
        fresh.game_number = self.state.game_number;
        fresh.revision = self.state.revision;

        let from = self.state.phase;
        self.state = fresh;
        info!("Game reset to setup");
        if from != GamePhase::Setup {
            self.event_bus.publish(GameEvent::PhaseChanged {
                from,
                to: GamePhase::Setup,
            });
        }
    }

    pub fn reveal_next_player(&mut self) {
        if self.state.phase != GamePhase::RevealRoles {
            return;
        }

        self.state.current_reveal_index += 1;
        if self.state.current_reveal_index >= self.state.players.len() {
            self.state.current_player_index = 0;
            self.arm_timer();
            self.set_phase(GamePhase::Playing);
        }
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.state.players.get(self.state.current_player_index)
    }

    pub fn next_player_turn(&mut self, timed_out: bool) {
        if self.state.phase != GamePhase::Playing {
            return;
        }

        if timed_out {
            if let Some(player_id) = self.current_player().map(|p| p.id) {
                let round = self.state.current_round;
                self.state.timeout_history.push(TimeoutRecord { player_id, round });
                debug!(%player_id, round, "Turn timed out");
                self.event_bus
                    .publish(GameEvent::TurnTimedOut { player_id, round });
            }
        }

        self.state.current_player_index += 1;
        if self.state.current_player_index >= self.state.players.len() {
            self.state.current_player_index = 0;
            self.state.player_turn_timer = 0;
            self.set_phase(GamePhase::Voting);
        } else {
            self.arm_timer();
        }
    }

    /// Apply a timer expiry only if it still belongs to the active turn
    pub fn expire_turn(&mut self, player_id: PlayerId) -> bool {
        let still_active = self.state.phase == GamePhase::Playing
            && self.current_player().is_some_and(|p| p.id == player_id);
        if still_active {
            self.next_player_turn(true);
        }
        still_active
    }

    pub fn tick_timer(&mut self) -> TimerTick {
        if self.state.phase != GamePhase::Playing || self.state.player_turn_timer == 0 {
            return TimerTick::Disarmed;
        }

        self.state.player_turn_timer -= 1;
        match (self.state.player_turn_timer, self.current_player()) {
            (0, Some(player)) => TimerTick::Expired(player.id),
            (0, None) => TimerTick::Disarmed,
            (remaining, _) => TimerTick::Running(remaining),
        }
    }

    pub fn disarm_timer(&mut self) {
        self.state.player_turn_timer = 0;
    }

    /// The voter whose turn it is in pass-the-device voting
    pub fn current_voter(&self) -> Option<&Player> {
        if self.state.phase != GamePhase::Voting {
            return None;
        }
        self.state.players.get(self.state.current_player_index)
    }

    /// Record one vote. Not idempotent: callers must allow at most one vote
    /// per voter per round.
    pub fn vote(&mut self, voter_id: PlayerId, target_id: PlayerId) -> bool {
        if self.state.phase != GamePhase::Voting {
            return false;
        }

        let (Some(voter_role), Some(target_role)) = (
            self.state.player(voter_id).map(|p| p.role),
            self.state.player(target_id).map(|p| p.role),
        ) else {
            return false;
        };

        let round = self.state.current_round;
        for player in &mut self.state.players {
            if player.id == voter_id {
                player.voted_for = Some(target_id);
            }
            if player.id == target_id {
                player.votes += 1;
            }
        }

        self.state.vote_history.push(VoteRecord {
            voter_id,
            voter_role,
            target_id,
            target_role,
            round,
        });
        debug!(%voter_id, %target_id, round, "Vote cast");
        self.event_bus.publish(GameEvent::VoteCast {
            voter_id,
            target_id,
            round,
        });
        true
    }

    /// Vote on behalf of the current voter and pass the device on
    pub fn vote_as_current_voter(&mut self, target_id: PlayerId) -> bool {
        let Some(voter_id) = self.current_voter().map(|p| p.id) else {
            return false;
        };
        let applied = self.vote(voter_id, target_id);
        if applied {
            self.state.current_player_index += 1;
        }
        applied
    }

    pub fn all_votes_in(&self) -> bool {
        self.state.phase == GamePhase::Voting
            && self.state.players.iter().all(|p| p.voted_for.is_some())
    }

    pub fn vote_outcome(&self) -> VoteOutcome {
        let mut ranked: Vec<&Player> = self.state.players.iter().collect();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));

        match ranked.as_slice() {
            [] => VoteOutcome::NoVotes,
            [top, ..] if top.votes == 0 => VoteOutcome::NoVotes,
            [top, second, ..] if second.votes > 0 && second.votes == top.votes => {
                VoteOutcome::Tie { votes: top.votes }
            }
            [top, ..] => VoteOutcome::Eliminate {
                player_id: top.id,
                votes: top.votes,
            },
        }
    }

    /// Close the vote: eliminate the leader or, on a tie or an empty ballot,
    /// move on to the next round
    pub fn resolve_votes(&mut self) -> VoteOutcome {
        let outcome = self.vote_outcome();
        match outcome {
            VoteOutcome::Eliminate { player_id, .. } => self.eliminate_player(player_id),
            VoteOutcome::Tie { .. } | VoteOutcome::NoVotes => self.continue_after_tie(),
        }
        outcome
    }

    pub fn eliminate_player(&mut self, player_id: PlayerId) {
        if self.state.phase != GamePhase::Voting {
            return;
        }
        let Some(role) = self.state.player(player_id).map(|p| p.role) else {
            return;
        };

        let round = self.state.current_round;
        let voter_ids = self
            .state
            .vote_history
            .iter()
            .filter(|v| v.round == round && v.target_id == player_id)
            .map(|v| v.voter_id)
            .collect();

        self.state.elimination_history.push(EliminationRecord {
            player_id,
            role,
            round,
            voter_ids,
        });
        self.state.eliminated_player_id = Some(player_id);
        info!(%player_id, ?role, round, "Player eliminated");
        self.event_bus.publish(GameEvent::PlayerEliminated {
            player_id,
            role,
            round,
        });

        let next = if role == Role::Imposter {
            GamePhase::ImposterGuess
        } else {
            GamePhase::RevealEliminated
        };
        self.set_phase(next);
    }

    pub fn process_elimination(&mut self) {
        if self.state.phase != GamePhase::RevealEliminated {
            return;
        }
        let Some(eliminated) = self.state.eliminated_player_id else {
            return;
        };

        self.state.players.retain(|p| p.id != eliminated);

        if self.state.players.len() == 2 && self.state.count_role(Role::Imposter) == 1 {
            self.state.eliminated_player_id = None;
            for player in &mut self.state.players {
                player.reset_votes();
            }
            info!("Final two players, imposter gets a last guess");
            self.set_phase(GamePhase::ImposterGuess);
            return;
        }

        self.settle_roster();
    }

    pub fn continue_after_tie(&mut self) {
        if self.state.phase != GamePhase::Voting {
            return;
        }
        let round = self.state.current_round;
        self.state.eliminated_player_id = None;
        self.event_bus.publish(GameEvent::TieContinued { round });
        self.next_round();
    }

    /// Who may guess right now: the imposter just voted out, or the last
    /// imposter standing in a final two
    pub fn guesser(&self) -> Option<PlayerId> {
        if self.state.phase != GamePhase::ImposterGuess {
            return None;
        }
        self.state.eliminated_player_id.or_else(|| {
            self.state
                .players
                .iter()
                .find(|p| p.role == Role::Imposter)
                .map(|p| p.id)
        })
    }

    /// Resolve the imposter's guess at the civilian word. Returns whether the
    /// guess was correct.
    pub fn handle_imposter_guess(&mut self, guess: &str) -> bool {
        if self.state.phase != GamePhase::ImposterGuess {
            return false;
        }

        let post_elimination = self.state.eliminated_player_id;
        let guesser = self.guesser();

        let correct = guess_matches(guess, &self.state.civilian_word);
        info!(correct, final_guess = post_elimination.is_none(), "Imposter guessed");
        self.event_bus.publish(GameEvent::GuessMade {
            player_id: guesser,
            correct,
        });

        if let Some(id) = post_elimination {
            self.state.players.retain(|p| p.id != id);
        }

        if correct {
            self.finish(Winner::Imposters);
            return true;
        }

        match post_elimination {
            Some(_) => {
                self.state.eliminated_player_id = None;
                self.settle_roster();
            }
            None => {
                // Losing the final guess is not a vote-out: no elimination
                // record, so the imposter keeps survival points for every round
                self.state.players.retain(|p| p.role != Role::Imposter);
                let winner = match self.state.players.first().map(|p| p.role) {
                    Some(Role::Spy) => Winner::Spy,
                    _ => Winner::Civilians,
                };
                self.finish(winner);
            }
        }
        false
    }

    pub fn survivors(&self) -> HashSet<PlayerId> {
        self.state.players.iter().map(|p| p.id).collect()
    }

    pub fn calculate_points(&self) -> Vec<PlayerPointsBreakdown> {
        let survivors = self.survivors();
        ScoringEngine::calculate_points(ScoringInput {
            vote_history: &self.state.vote_history,
            snapshot: &self.state.all_players_snapshot,
            elimination_history: &self.state.elimination_history,
            timeout_history: &self.state.timeout_history,
            current_round: self.state.current_round,
            winner: self.state.winner,
            survivors: &survivors,
        })
    }

    /// The record stored for a finished game, `None` while undecided
    pub fn result_record(&self, room_id: RoomId) -> Option<GameResultRecord> {
        let winner = self.state.winner?;
        let players = self
            .calculate_points()
            .into_iter()
            .map(|b| PlayerResult {
                player_id: b.player_id,
                name: b.name,
                role: b.role,
                points: b.total,
                eliminated: b.eliminated,
            })
            .collect();

        Some(GameResultRecord {
            room_id,
            game_number: self.state.game_number,
            winner,
            civilian_word: self.state.civilian_word.clone(),
            spy_word: self.state.spy_word.clone(),
            imposter_hint: self.state.imposter_hint.clone(),
            players,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn deal(&mut self) {
        let assigned = assign_roles(
            &self.state.original_players,
            self.state.imposter_count,
            self.state.spy_count,
            &self.words,
            &mut self.rng,
        );

        let state = &mut self.state;
        state.players = assigned.players;
        state.all_players_snapshot = assigned.snapshot;
        state.civilian_word = assigned.civilian_word;
        state.spy_word = assigned.spy_word;
        state.imposter_hint = assigned.imposter_hint;
        state.vote_history.clear();
        state.elimination_history.clear();
        state.timeout_history.clear();
        state.current_round = 1;
        state.current_player_index = 0;
        state.current_reveal_index = 0;
        state.player_turn_timer = 0;
        state.eliminated_player_id = None;
        state.winner = None;
        state.game_number += 1;

        if let Some(room) = state.room.as_mut() {
            let mine = state.players.iter().find(|p| p.id == room.player_id);
            room.my_role = mine.map(|p| p.role);
            room.my_word = mine.map(|p| p.word.clone());
        }

        info!(
            game_number = self.state.game_number,
            players = self.state.players.len(),
            "Roles assigned"
        );
        self.event_bus.publish(GameEvent::RolesAssigned {
            game_number: self.state.game_number,
            player_count: self.state.players.len(),
        });
        self.set_phase(GamePhase::RevealRoles);
    }

    /// Win evaluation once a player has left the live roster
    fn settle_roster(&mut self) {
        let imposters = self.state.count_role(Role::Imposter);
        let spies = self.state.count_role(Role::Spy);
        let civilians = self.state.count_role(Role::Civilian);

        if imposters == 0 {
            if spies == 0 {
                self.finish(Winner::Civilians);
            } else if self.state.spy_count > 0 && (spies == civilians || civilians == 0) {
                self.finish(Winner::Spy);
            } else {
                self.next_round();
            }
        } else if spies + civilians == 0 {
            self.finish(Winner::Imposters);
        } else {
            self.next_round();
        }
    }

    fn next_round(&mut self) {
        for player in &mut self.state.players {
            player.reset_votes();
        }
        self.state.eliminated_player_id = None;
        self.state.current_round += 1;
        self.state.current_player_index = 0;
        self.arm_timer();
        debug!(round = self.state.current_round, "Next round");
        self.set_phase(GamePhase::Playing);
    }

    fn finish(&mut self, winner: Winner) {
        self.state.winner = Some(winner);
        self.state.player_turn_timer = 0;
        info!(?winner, game_number = self.state.game_number, "Game finished");
        self.event_bus.publish(GameEvent::GameFinished {
            winner,
            game_number: self.state.game_number,
        });
        self.set_phase(GamePhase::Results);
    }

    fn arm_timer(&mut self) {
        self.state.player_turn_timer = self.state.round_duration;
    }

    fn set_phase(&mut self, phase: GamePhase) {
        let from = self.state.phase;
        self.state.phase = phase;
        if from != phase {
            debug!(?from, to = ?phase, "Phase changed");
            self.event_bus
                .publish(GameEvent::PhaseChanged { from, to: phase });
        }
    }

    fn require_phase(&self, action: &'static str, allowed: &[GamePhase]) -> Result<(), SetupError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(SetupError::WrongPhase {
                action,
                phase: format!("{:?}", self.state.phase),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::IMPOSTER_SURVIVAL_PER_ROUND;

    fn session(players: u32, imposters: u32, spies: u32) -> GameSession {
        let mut session = GameSession::with_seed(GameMode::Local, WordBank::builtin().unwrap(), 17);
        session.configure(players, imposters, spies, 0).unwrap();
        let names: Vec<String> = (0..players).map(|i| format!("P{}", i)).collect();
        session.start_with_names(&names).unwrap();
        session
    }

    fn id_of(session: &GameSession, role: Role) -> PlayerId {
        session.state.players.iter().find(|p| p.role == role).unwrap().id
    }

    fn to_voting(session: &mut GameSession) {
        while session.phase() == GamePhase::RevealRoles {
            session.reveal_next_player();
        }
        while session.phase() == GamePhase::Playing {
            session.next_player_turn(false);
        }
    }

    #[test]
    fn test_configure_rejects_invalid_counts() {
        let mut session = GameSession::new(GameMode::Local, WordBank::builtin().unwrap());
        assert!(session.configure(5, 2, 0, 0).is_err());
        assert_eq!(session.phase(), GamePhase::Setup);

        session.configure(5, 1, 1, 30).unwrap();
        assert_eq!(session.phase(), GamePhase::Names);
        assert_eq!(session.max_imposters(), 1);
    }

    #[test]
    fn test_online_configure_goes_to_lobby() {
        let mut session = GameSession::new(GameMode::Online, WordBank::builtin().unwrap());
        session.configure(4, 1, 0, 0).unwrap();
        assert_eq!(session.phase(), GamePhase::OnlineLobby);
    }

    #[test]
    fn test_roster_validation() {
        let mut session = GameSession::with_seed(GameMode::Local, WordBank::builtin().unwrap(), 1);
        session.configure(3, 1, 0, 0).unwrap();

        assert_eq!(
            session.start_with_names(&["A", "B"]),
            Err(SetupError::RosterSizeMismatch { expected: 3, actual: 2 })
        );
        assert_eq!(session.start_with_names(&["A", " ", "C"]), Err(SetupError::EmptyName));
        assert!(matches!(
            session.start_with_names(&["Ann", "ann", "C"]),
            Err(SetupError::DuplicateName { .. })
        ));
        assert_eq!(session.phase(), GamePhase::Names);

        session.start_with_names(&["A", "B", "C"]).unwrap();
        assert_eq!(session.phase(), GamePhase::RevealRoles);
        assert_eq!(session.state.current_round, 1);
        assert_eq!(session.state.game_number, 1);
    }

    #[test]
    fn test_reveal_then_turns_then_voting() {
        let mut session = GameSession::with_seed(GameMode::Local, WordBank::builtin().unwrap(), 2);
        session.configure(3, 1, 0, 20).unwrap();
        session.start_with_names(&["A", "B", "C"]).unwrap();

        session.reveal_next_player();
        session.reveal_next_player();
        assert_eq!(session.phase(), GamePhase::RevealRoles);
        session.reveal_next_player();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.state.player_turn_timer, 20);

        let first = session.current_player().unwrap().id;
        session.next_player_turn(true);
        assert_eq!(session.state.timeout_history.len(), 1);
        assert_eq!(session.state.timeout_history[0].player_id, first);
        assert_eq!(session.state.player_turn_timer, 20);

        session.next_player_turn(false);
        session.next_player_turn(false);
        assert_eq!(session.phase(), GamePhase::Voting);
        assert_eq!(session.state.player_turn_timer, 0);
        assert_eq!(session.state.players.len(), 3);
    }

    #[test]
    fn test_timer_ticks_down_to_expiry() {
        let mut session = GameSession::with_seed(GameMode::Local, WordBank::builtin().unwrap(), 3);
        session.configure(3, 1, 0, 2).unwrap();
        session.start_with_names(&["A", "B", "C"]).unwrap();
        assert_eq!(session.tick_timer(), TimerTick::Disarmed);

        for _ in 0..3 {
            session.reveal_next_player();
        }
        let active = session.current_player().unwrap().id;
        assert_eq!(session.tick_timer(), TimerTick::Running(1));
        assert_eq!(session.tick_timer(), TimerTick::Expired(active));

        let other = session.state.players[1].id;
        assert!(!session.expire_turn(other));
        assert!(session.expire_turn(active));
        assert_eq!(session.state.current_player_index, 1);

        session.disarm_timer();
        assert_eq!(session.tick_timer(), TimerTick::Disarmed);
    }

    #[test]
    fn test_no_timer_when_duration_zero() {
        let mut session = session(3, 1, 0);
        for _ in 0..3 {
            session.reveal_next_player();
        }
        assert_eq!(session.tick_timer(), TimerTick::Disarmed);
    }

    #[test]
    fn test_vote_is_not_idempotent() {
        let mut session = session(4, 1, 0);
        to_voting(&mut session);

        let voter = session.state.players[0].id;
        let target = session.state.players[1].id;
        assert!(session.vote(voter, target));
        assert!(session.vote(voter, target));

        assert_eq!(session.state.player(target).unwrap().votes, 2);
        assert_eq!(session.state.vote_history.len(), 2);
        assert_eq!(session.state.player(voter).unwrap().voted_for, Some(target));
    }

    #[test]
    fn test_illegal_votes_are_ignored() {
        let mut session = session(4, 1, 0);
        let voter = session.state.players[0].id;
        let target = session.state.players[1].id;
        assert!(!session.vote(voter, target));

        to_voting(&mut session);
        assert!(!session.vote(Uuid::new_v4(), target));
        assert!(!session.vote(voter, Uuid::new_v4()));
        assert!(session.state.vote_history.is_empty());
    }

    #[test]
    fn test_pass_the_device_voting() {
        let mut session = session(3, 1, 0);
        to_voting(&mut session);
        let target = session.state.players[2].id;

        assert!(session.vote_as_current_voter(target));
        assert!(session.vote_as_current_voter(target));
        assert!(!session.all_votes_in());
        let last_target = session.state.players[0].id;
        assert!(session.vote_as_current_voter(last_target));
        assert!(session.all_votes_in());
        assert!(session.current_voter().is_none());

        assert_eq!(
            session.vote_outcome(),
            VoteOutcome::Eliminate { player_id: target, votes: 2 }
        );
    }

    #[test]
    fn test_vote_outcome_requires_positive_tie() {
        let mut session = session(4, 1, 0);
        to_voting(&mut session);
        assert_eq!(session.vote_outcome(), VoteOutcome::NoVotes);

        let ids: Vec<PlayerId> = session.state.players.iter().map(|p| p.id).collect();
        session.vote(ids[0], ids[1]);
        session.vote(ids[1], ids[0]);
        assert_eq!(session.vote_outcome(), VoteOutcome::Tie { votes: 1 });

        session.vote(ids[2], ids[1]);
        assert_eq!(
            session.vote_outcome(),
            VoteOutcome::Eliminate { player_id: ids[1], votes: 2 }
        );
    }

    #[test]
    fn test_elimination_records_round_voters() {
        let mut session = session(4, 1, 0);
        to_voting(&mut session);
        let civilian = id_of(&session, Role::Civilian);
        let voters: Vec<PlayerId> = session
            .state
            .players
            .iter()
            .filter(|p| p.id != civilian)
            .map(|p| p.id)
            .take(2)
            .collect();
        for voter in &voters {
            session.vote(*voter, civilian);
        }

        session.resolve_votes();
        assert_eq!(session.phase(), GamePhase::RevealEliminated);
        assert_eq!(session.state.eliminated_player_id, Some(civilian));
        let record = &session.state.elimination_history[0];
        assert_eq!(record.voter_ids, voters);
        assert_eq!(record.role, Role::Civilian);

        session.process_elimination();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.state.current_round, 2);
        assert_eq!(session.state.players.len(), 3);
        assert!(session.state.players.iter().all(|p| p.votes == 0));
        assert_eq!(session.state.all_players_snapshot.len(), 4);
    }

    #[test]
    fn test_final_one_on_one_correct_guess() {
        let mut session = session(3, 1, 0);
        to_voting(&mut session);
        let civilian = id_of(&session, Role::Civilian);
        let voter = id_of(&session, Role::Imposter);
        session.vote(voter, civilian);
        session.resolve_votes();
        session.process_elimination();

        assert_eq!(session.phase(), GamePhase::ImposterGuess);
        assert_eq!(session.state.eliminated_player_id, None);

        let word = format!("  {} ", session.state.civilian_word.to_uppercase());
        assert!(session.handle_imposter_guess(&word));
        assert_eq!(session.state.winner, Some(Winner::Imposters));
        assert_eq!(session.phase(), GamePhase::Results);
    }

    #[test]
    fn test_final_one_on_one_wrong_guess_goes_to_last_player() {
        let mut session = session(3, 1, 0);
        to_voting(&mut session);
        let civilian = id_of(&session, Role::Civilian);
        let voter = id_of(&session, Role::Imposter);
        session.vote(voter, civilian);
        session.resolve_votes();
        session.process_elimination();

        assert_eq!(session.guesser(), Some(voter));
        assert!(!session.handle_imposter_guess("definitely wrong"));
        assert_eq!(session.state.winner, Some(Winner::Civilians));
        assert_eq!(session.state.players.len(), 1);
        assert_eq!(session.state.players[0].role, Role::Civilian);
        assert_eq!(session.guesser(), None);

        // Out of the game but never voted out, so every round counts as survived
        assert_eq!(session.state.elimination_history.len(), 1);
        let points = session.calculate_points();
        let imposter = points.iter().find(|b| b.player_id == voter).unwrap();
        assert!(imposter.eliminated);
        assert_eq!(
            imposter.survival_points,
            session.state.current_round as i32 * IMPOSTER_SURVIVAL_PER_ROUND
        );
    }

    #[test]
    fn test_spy_wins_at_parity() {
        let mut session = session(4, 1, 1);
        to_voting(&mut session);
        let imposter = id_of(&session, Role::Imposter);
        session.vote(session.state.players[0].id, imposter);
        session.resolve_votes();
        assert_eq!(session.phase(), GamePhase::ImposterGuess);

        // 1 spy + 2 civilians remain, game continues
        session.handle_imposter_guess("nope");
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.state.current_round, 2);

        for _ in 0..3 {
            session.next_player_turn(false);
        }
        let civilian = id_of(&session, Role::Civilian);
        let spy = id_of(&session, Role::Spy);
        session.vote(spy, civilian);
        session.resolve_votes();
        session.process_elimination();

        assert_eq!(session.state.winner, Some(Winner::Spy));
        assert_eq!(session.phase(), GamePhase::Results);
    }

    #[test]
    fn test_civilians_win_when_no_hidden_roles_remain() {
        let mut session = session(4, 0, 1);
        to_voting(&mut session);
        let spy = id_of(&session, Role::Spy);
        session.vote(session.state.players[0].id, spy);
        session.resolve_votes();
        session.process_elimination();

        assert_eq!(session.state.winner, Some(Winner::Civilians));
    }

    #[test]
    fn test_results_points_and_record() {
        let mut session = session(3, 1, 0);
        to_voting(&mut session);
        let imposter = id_of(&session, Role::Imposter);
        let civilian = id_of(&session, Role::Civilian);
        session.vote(civilian, imposter);
        session.resolve_votes();
        session.handle_imposter_guess("wrong");
        assert_eq!(session.state.winner, Some(Winner::Civilians));

        let points = session.calculate_points();
        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|w| w[0].total >= w[1].total));

        let room_id = Uuid::new_v4();
        let record = session.result_record(room_id).unwrap();
        assert_eq!(record.room_id, room_id);
        assert_eq!(record.game_number, 1);
        assert_eq!(record.players.len(), 3);
    }

    #[test]
    fn test_result_record_requires_winner() {
        let session = session(3, 1, 0);
        assert!(session.result_record(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_play_again_keeps_roster_and_counts() {
        let mut session = session(5, 1, 1);
        let mut before: Vec<PlayerId> = session.state.original_players.iter().map(|p| p.id).collect();
        to_voting(&mut session);
        session.vote(session.state.players[0].id, session.state.players[1].id);

        session.play_again();
        assert_eq!(session.phase(), GamePhase::RevealRoles);
        assert_eq!(session.state.game_number, 2);
        assert!(session.state.vote_history.is_empty());
        assert_eq!(session.state.current_round, 1);
        assert_eq!(session.state.count_role(Role::Imposter), 1);
        assert_eq!(session.state.count_role(Role::Spy), 1);

        let mut after: Vec<PlayerId> = session.state.players.iter().map(|p| p.id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reset_game_keeps_room_and_counter() {
        let mut session = session(3, 1, 0);
        session.reset_game();
        assert_eq!(session.phase(), GamePhase::Setup);
        assert!(session.state.players.is_empty());
        assert!(session.state.original_players.is_empty());
        assert_eq!(session.state.game_number, 1);

        session.play_again();
        assert_eq!(session.phase(), GamePhase::Setup);
    }
}
