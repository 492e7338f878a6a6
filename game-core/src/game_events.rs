use game_types::{GamePhase, PlayerId, Role, Winner};

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    RolesAssigned {
        game_number: u32,
        player_count: usize,
    },
    TurnTimedOut {
        player_id: PlayerId,
        round: u32,
    },
    VoteCast {
        voter_id: PlayerId,
        target_id: PlayerId,
        round: u32,
    },
    PlayerEliminated {
        player_id: PlayerId,
        role: Role,
        round: u32,
    },
    TieContinued {
        round: u32,
    },
    GuessMade {
        player_id: Option<PlayerId>,
        correct: bool,
    },
    GameFinished {
        winner: Winner,
        game_number: u32,
    },
}

/// Event handler trait for processing game events
pub trait GameEventHandler: Send {
    fn handle_event(&mut self, event: GameEvent);
}

/// Simple event bus for distributing game events
pub struct GameEventBus {
    handlers: Vec<Box<dyn GameEventHandler>>,
}

impl GameEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn GameEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: GameEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for GameEventBus {
    fn default() -> Self {
        Self::new()
    }
}
