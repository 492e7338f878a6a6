use game_types::{Player, Role};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::{SetupError, WordBank};

pub const MIN_PLAYERS: u32 = 3;

/// Result of one role assignment
#[derive(Debug, Clone)]
pub struct AssignedRoster {
    pub players: Vec<Player>,
    pub snapshot: Vec<Player>,
    pub civilian_word: String,
    pub spy_word: Option<String>,
    pub imposter_hint: String,
}

/// Imposter ceiling for a table of `player_count`
pub fn max_imposters(player_count: u32) -> u32 {
    if player_count < 7 { 1 } else { 2 }
}

/// Hidden roles (imposters + spies) may never exceed half the table
pub fn max_hidden_roles(player_count: u32) -> u32 {
    player_count / 2
}

pub fn validate_counts(
    player_count: u32,
    imposter_count: u32,
    spy_count: u32,
) -> Result<(), SetupError> {
    if player_count < MIN_PLAYERS {
        return Err(SetupError::TooFewPlayers {
            min: MIN_PLAYERS,
            actual: player_count,
        });
    }

    let hidden = imposter_count + spy_count;
    if hidden == 0 {
        return Err(SetupError::NoHiddenRoles);
    }

    let max_imposters = max_imposters(player_count);
    if imposter_count > max_imposters {
        return Err(SetupError::TooManyImposters {
            requested: imposter_count,
            max: max_imposters,
            player_count,
        });
    }

    let max_hidden = max_hidden_roles(player_count);
    if hidden > max_hidden {
        return Err(SetupError::TooManyHiddenRoles {
            requested: hidden,
            max: max_hidden,
            player_count,
        });
    }

    Ok(())
}

/// Partition `players` into imposters, spies and civilians.
///
/// Counts are trusted as given: the index cut-offs stay well defined even when
/// they exceed the roster, in which case later roles simply receive nobody.
/// The role-tagged list is shuffled a second time so the reveal order says
/// nothing about who was picked first.
pub fn assign_roles<R: Rng + ?Sized>(
    players: &[Player],
    imposter_count: u32,
    spy_count: u32,
    words: &WordBank,
    rng: &mut R,
) -> AssignedRoster {
    let mut shuffled: Vec<Player> = players.to_vec();
    shuffled.shuffle(rng);

    let pair = words.random_word_pair(rng);
    let flip: bool = rng.gen_bool(0.5);
    let (civilian_word, other_word) = if flip {
        (pair.word1, pair.word2)
    } else {
        (pair.word2, pair.word1)
    };
    let spy_word = (spy_count > 0).then_some(other_word);
    let imposter_hint = pair.hint;

    let imposter_cutoff = imposter_count as usize;
    let spy_cutoff = imposter_cutoff + spy_count as usize;

    for (index, player) in shuffled.iter_mut().enumerate() {
        let (role, word) = if index < imposter_cutoff {
            (Role::Imposter, imposter_hint.clone())
        } else if index < spy_cutoff {
            (Role::Spy, spy_word.clone().unwrap_or_default())
        } else {
            (Role::Civilian, civilian_word.clone())
        };

        player.role = role;
        player.word = word;
        player.reset_votes();
    }

    shuffled.shuffle(rng);

    AssignedRoster {
        snapshot: shuffled.clone(),
        players: shuffled,
        civilian_word,
        spy_word,
        imposter_hint,
    }
}
