#![allow(dead_code)]

use game_core::{GameEvent, GameEventHandler, GameSession, WordBank};
use game_types::{GameMode, GamePhase, Player, PlayerId, Role};
use std::sync::{Arc, Mutex};

/// Word bank with a single known pair so guesses can be scripted
pub fn create_test_words() -> WordBank {
    WordBank::from_word_list("ice cream | frozen yogurt | dessert").unwrap()
}

pub fn create_test_names(count: u32) -> Vec<String> {
    (0..count).map(|i| format!("Player{}", i + 1)).collect()
}

/// Creates a local session dealt and waiting in reveal-roles
pub fn create_dealt_session(players: u32, imposters: u32, spies: u32) -> GameSession {
    create_dealt_session_with_seed(players, imposters, spies, 42)
}

pub fn create_dealt_session_with_seed(
    players: u32,
    imposters: u32,
    spies: u32,
    seed: u64,
) -> GameSession {
    let mut session = GameSession::with_seed(GameMode::Local, create_test_words(), seed);
    session.configure(players, imposters, spies, 0).unwrap();
    session.start_with_names(&create_test_names(players)).unwrap();
    session
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<GameEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&GameEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl GameEventHandler for EventCollector {
    fn handle_event(&mut self, event: GameEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Reveal every role and let every player talk
pub fn advance_to_voting(session: &mut GameSession) {
    while session.phase() == GamePhase::RevealRoles {
        session.reveal_next_player();
    }
    while session.phase() == GamePhase::Playing {
        session.next_player_turn(false);
    }
    assert_eq!(session.phase(), GamePhase::Voting);
}

pub fn players_with_role(session: &GameSession, role: Role) -> Vec<Player> {
    session
        .state
        .players
        .iter()
        .filter(|p| p.role == role)
        .cloned()
        .collect()
}

pub fn first_with_role(session: &GameSession, role: Role) -> PlayerId {
    players_with_role(session, role)
        .first()
        .map(|p| p.id)
        .unwrap_or_else(|| panic!("no live {:?}", role))
}

/// Every other live player votes for `target`
pub fn vote_out(session: &mut GameSession, target: PlayerId) {
    let voters: Vec<PlayerId> = session
        .state
        .players
        .iter()
        .map(|p| p.id)
        .filter(|id| *id != target)
        .collect();
    for voter in voters {
        assert!(session.vote(voter, target));
    }
    session.resolve_votes();
}
