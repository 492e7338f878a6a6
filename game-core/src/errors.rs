use thiserror::Error;

/// Configuration problems caught before a game starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("need at least {min} players, got {actual}")]
    TooFewPlayers { min: u32, actual: u32 },

    #[error("at least one imposter or spy is required")]
    NoHiddenRoles,

    #[error("{requested} hidden roles exceed the limit of {max} for {player_count} players")]
    TooManyHiddenRoles {
        requested: u32,
        max: u32,
        player_count: u32,
    },

    #[error("{requested} imposters exceed the limit of {max} for {player_count} players")]
    TooManyImposters {
        requested: u32,
        max: u32,
        player_count: u32,
    },

    #[error("expected {expected} player names, got {actual}")]
    RosterSizeMismatch { expected: u32, actual: u32 },

    #[error("player name cannot be empty")]
    EmptyName,

    #[error("duplicate player name: {name}")]
    DuplicateName { name: String },

    #[error("cannot {action} during the {phase} phase")]
    WrongPhase { action: &'static str, phase: String },
}

#[derive(Debug, Error)]
pub enum WordBankError {
    #[error("word list contains no usable pairs")]
    Empty,

    #[error("malformed word pair on line {line}: {content}")]
    Malformed { line: usize, content: String },

    #[error("failed to read word list: {0}")]
    Io(#[from] std::io::Error),
}
