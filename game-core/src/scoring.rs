use game_types::{
    EliminationRecord, Player, PlayerId, PlayerPointsBreakdown, Role, TimeoutRecord, VoteRecord,
    Winner,
};
use std::collections::HashSet;

pub const CIVILIAN_WIN_SURVIVED: i32 = 10;
pub const CIVILIAN_WIN_ELIMINATED: i32 = 5;
pub const CIVILIAN_VOTE_IMPOSTER: i32 = 3;
pub const CIVILIAN_VOTE_SPY: i32 = 2;
pub const CIVILIAN_VOTE_CIVILIAN: i32 = -1;

pub const SPY_WIN: i32 = 12;
pub const SPY_VOTE_CIVILIAN: i32 = 1;
pub const SPY_VOTE_SPY: i32 = -2;

pub const IMPOSTER_WIN: i32 = 15;
pub const IMPOSTER_SURVIVAL_PER_ROUND: i32 = 2;
pub const IMPOSTER_VOTE_SPY: i32 = 2;
pub const IMPOSTER_VOTE_IMPOSTER: i32 = -3;

pub const TIMEOUT_PENALTY: i32 = -1;

/// Everything the scoring policy looks at, borrowed from a finished session
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub vote_history: &'a [VoteRecord],
    pub snapshot: &'a [Player],
    pub elimination_history: &'a [EliminationRecord],
    pub timeout_history: &'a [TimeoutRecord],
    pub current_round: u32,
    pub winner: Option<Winner>,
    pub survivors: &'a HashSet<PlayerId>,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Score every player in the snapshot, including those removed mid-game.
    /// The result is sorted by total (highest first) and dense-ranked.
    pub fn calculate_points(input: ScoringInput<'_>) -> Vec<PlayerPointsBreakdown> {
        let mut breakdowns: Vec<PlayerPointsBreakdown> = input
            .snapshot
            .iter()
            .map(|player| Self::score_player(player, &input))
            .collect();

        breakdowns.sort_by(|a, b| b.total.cmp(&a.total));
        Self::assign_ranks(&mut breakdowns);
        breakdowns
    }

    fn score_player(player: &Player, input: &ScoringInput<'_>) -> PlayerPointsBreakdown {
        let survived = input.survivors.contains(&player.id);
        let won = input.winner.is_some_and(|w| w.includes(player.role));

        let win_points = match (player.role, won) {
            (Role::Civilian, true) if survived => CIVILIAN_WIN_SURVIVED,
            (Role::Civilian, true) => CIVILIAN_WIN_ELIMINATED,
            (Role::Spy, true) => SPY_WIN,
            (Role::Imposter, true) => IMPOSTER_WIN,
            _ => 0,
        };

        let vote_points = input
            .vote_history
            .iter()
            .filter(|vote| vote.voter_id == player.id)
            .map(|vote| Self::vote_delta(player.role, vote.target_role))
            .sum();

        let survival_points = if player.role == Role::Imposter {
            let rounds_survived = input
                .elimination_history
                .iter()
                .find(|e| e.player_id == player.id)
                .map(|e| e.round.saturating_sub(1))
                .unwrap_or(input.current_round);
            rounds_survived as i32 * IMPOSTER_SURVIVAL_PER_ROUND
        } else {
            0
        };

        let timeouts = input
            .timeout_history
            .iter()
            .filter(|t| t.player_id == player.id)
            .count() as i32;
        let timeout_points = timeouts * TIMEOUT_PENALTY;

        PlayerPointsBreakdown {
            player_id: player.id,
            name: player.name.clone(),
            role: player.role,
            eliminated: !survived,
            win_points,
            vote_points,
            survival_points,
            timeout_points,
            total: win_points + vote_points + survival_points + timeout_points,
            rank: 0,
        }
    }

    /// Points for a single vote cast by `voter` against `target`
    pub fn vote_delta(voter: Role, target: Role) -> i32 {
        match (voter, target) {
            (Role::Civilian, Role::Imposter) => CIVILIAN_VOTE_IMPOSTER,
            (Role::Civilian, Role::Spy) => CIVILIAN_VOTE_SPY,
            (Role::Civilian, Role::Civilian) => CIVILIAN_VOTE_CIVILIAN,
            (Role::Spy, Role::Civilian) => SPY_VOTE_CIVILIAN,
            (Role::Spy, Role::Spy) => SPY_VOTE_SPY,
            (Role::Imposter, Role::Spy) => IMPOSTER_VOTE_SPY,
            (Role::Imposter, Role::Imposter) => IMPOSTER_VOTE_IMPOSTER,
            _ => 0,
        }
    }

    /// Expects `breakdowns` sorted by total, highest first
    pub fn assign_ranks(breakdowns: &mut [PlayerPointsBreakdown]) {
        let ranks = dense_ranks(breakdowns, |b| b.total);
        for (breakdown, rank) in breakdowns.iter_mut().zip(ranks) {
            breakdown.rank = rank;
        }
    }
}

/// Equal totals share a rank; a rank is one more than the number of
/// distinct totals strictly above it. Expects `sorted` highest first.
pub fn dense_ranks<T>(sorted: &[T], total: impl Fn(&T) -> i32) -> Vec<u32> {
    let mut rank = 0;
    let mut previous: Option<i32> = None;

    sorted
        .iter()
        .map(|item| {
            let total = total(item);
            if previous != Some(total) {
                rank += 1;
                previous = Some(total);
            }
            rank
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player(name: &str, role: Role) -> Player {
        let mut p = Player::new(Uuid::new_v4(), name);
        p.role = role;
        p
    }

    fn vote(voter: &Player, target: &Player, round: u32) -> VoteRecord {
        VoteRecord {
            voter_id: voter.id,
            voter_role: voter.role,
            target_id: target.id,
            target_role: target.role,
            round,
        }
    }

    fn find<'a>(results: &'a [PlayerPointsBreakdown], name: &str) -> &'a PlayerPointsBreakdown {
        results.iter().find(|b| b.name == name).unwrap()
    }

    #[test]
    fn test_civilian_win_survived_has_base_points() {
        let alice = player("Alice", Role::Civilian);
        let bob = player("Bob", Role::Civilian);
        let eve = player("Eve", Role::Imposter);
        let snapshot = vec![alice.clone(), bob.clone(), eve.clone()];
        let votes = vec![vote(&alice, &bob, 1), vote(&alice, &eve, 2)];
        let eliminations = vec![EliminationRecord {
            player_id: eve.id,
            role: Role::Imposter,
            round: 2,
            voter_ids: vec![alice.id],
        }];
        let survivors: HashSet<_> = [alice.id, bob.id].into_iter().collect();

        let results = ScoringEngine::calculate_points(ScoringInput {
            vote_history: &votes,
            snapshot: &snapshot,
            elimination_history: &eliminations,
            timeout_history: &[],
            current_round: 2,
            winner: Some(Winner::Civilians),
            survivors: &survivors,
        });

        let alice_points = find(&results, "Alice");
        assert_eq!(alice_points.win_points, CIVILIAN_WIN_SURVIVED);
        assert_eq!(
            alice_points.vote_points,
            CIVILIAN_VOTE_CIVILIAN + CIVILIAN_VOTE_IMPOSTER
        );
        assert!(alice_points.total >= CIVILIAN_WIN_SURVIVED);

        let eve_points = find(&results, "Eve");
        assert_eq!(eve_points.win_points, 0);
        assert_eq!(eve_points.survival_points, IMPOSTER_SURVIVAL_PER_ROUND);
        assert!(eve_points.eliminated);
    }

    #[test]
    fn test_eliminated_civilian_gets_lower_award() {
        let alice = player("Alice", Role::Civilian);
        let eve = player("Eve", Role::Imposter);
        let snapshot = vec![alice.clone(), eve.clone()];
        let survivors: HashSet<_> = HashSet::new();

        let results = ScoringEngine::calculate_points(ScoringInput {
            vote_history: &[],
            snapshot: &snapshot,
            elimination_history: &[],
            timeout_history: &[],
            current_round: 1,
            winner: Some(Winner::Civilians),
            survivors: &survivors,
        });

        assert_eq!(find(&results, "Alice").win_points, CIVILIAN_WIN_ELIMINATED);
    }

    #[test]
    fn test_spy_votes_count_regardless_of_outcome() {
        let spy = player("Sam", Role::Spy);
        let civ = player("Cara", Role::Civilian);
        let other_spy = player("Sid", Role::Spy);
        let snapshot = vec![spy.clone(), civ.clone(), other_spy.clone()];
        let votes = vec![vote(&spy, &civ, 1), vote(&spy, &other_spy, 2)];
        let survivors: HashSet<_> = [spy.id].into_iter().collect();

        let results = ScoringEngine::calculate_points(ScoringInput {
            vote_history: &votes,
            snapshot: &snapshot,
            elimination_history: &[],
            timeout_history: &[],
            current_round: 2,
            winner: Some(Winner::Civilians),
            survivors: &survivors,
        });

        let sam = find(&results, "Sam");
        assert_eq!(sam.win_points, 0);
        assert_eq!(sam.vote_points, SPY_VOTE_CIVILIAN + SPY_VOTE_SPY);
    }

    #[test]
    fn test_imposter_survival_and_win() {
        let eve = player("Eve", Role::Imposter);
        let mallory = player("Mallory", Role::Imposter);
        let spy = player("Sam", Role::Spy);
        let snapshot = vec![eve.clone(), mallory.clone(), spy.clone()];
        let votes = vec![vote(&eve, &spy, 1), vote(&mallory, &eve, 1)];
        let eliminations = vec![EliminationRecord {
            player_id: mallory.id,
            role: Role::Imposter,
            round: 3,
            voter_ids: vec![],
        }];
        let survivors: HashSet<_> = [eve.id, spy.id].into_iter().collect();

        let results = ScoringEngine::calculate_points(ScoringInput {
            vote_history: &votes,
            snapshot: &snapshot,
            elimination_history: &eliminations,
            timeout_history: &[],
            current_round: 4,
            winner: Some(Winner::Imposters),
            survivors: &survivors,
        });

        let eve_points = find(&results, "Eve");
        assert_eq!(eve_points.win_points, IMPOSTER_WIN);
        assert_eq!(eve_points.survival_points, 4 * IMPOSTER_SURVIVAL_PER_ROUND);
        assert_eq!(eve_points.vote_points, IMPOSTER_VOTE_SPY);

        let mallory_points = find(&results, "Mallory");
        assert_eq!(mallory_points.survival_points, 2 * IMPOSTER_SURVIVAL_PER_ROUND);
        assert_eq!(mallory_points.vote_points, IMPOSTER_VOTE_IMPOSTER);
    }

    #[test]
    fn test_timeouts_penalize_every_role() {
        let civ = player("Cara", Role::Civilian);
        let eve = player("Eve", Role::Imposter);
        let snapshot = vec![civ.clone(), eve.clone()];
        let timeouts = vec![
            TimeoutRecord { player_id: civ.id, round: 1 },
            TimeoutRecord { player_id: civ.id, round: 2 },
            TimeoutRecord { player_id: eve.id, round: 2 },
        ];
        let survivors: HashSet<_> = [civ.id, eve.id].into_iter().collect();

        let results = ScoringEngine::calculate_points(ScoringInput {
            vote_history: &[],
            snapshot: &snapshot,
            elimination_history: &[],
            timeout_history: &timeouts,
            current_round: 2,
            winner: None,
            survivors: &survivors,
        });

        assert_eq!(find(&results, "Cara").timeout_points, 2 * TIMEOUT_PENALTY);
        assert_eq!(find(&results, "Eve").timeout_points, TIMEOUT_PENALTY);
    }

    #[test]
    fn test_sorted_and_dense_ranked() {
        let mut breakdowns: Vec<PlayerPointsBreakdown> = [12, 10, 10, 7, 7, 3]
            .iter()
            .enumerate()
            .map(|(i, total)| PlayerPointsBreakdown {
                player_id: Uuid::new_v4(),
                name: format!("P{}", i),
                role: Role::Civilian,
                eliminated: false,
                win_points: *total,
                vote_points: 0,
                survival_points: 0,
                timeout_points: 0,
                total: *total,
                rank: 0,
            })
            .collect();

        ScoringEngine::assign_ranks(&mut breakdowns);
        let ranks: Vec<u32> = breakdowns.iter().map(|b| b.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 3, 3, 4]);
    }

    #[test]
    fn test_vote_delta_table() {
        assert_eq!(ScoringEngine::vote_delta(Role::Civilian, Role::Civilian), -1);
        assert!(ScoringEngine::vote_delta(Role::Civilian, Role::Civilian) <= 0);
        assert_eq!(ScoringEngine::vote_delta(Role::Spy, Role::Imposter), 0);
        assert_eq!(ScoringEngine::vote_delta(Role::Imposter, Role::Civilian), 0);
    }
}
