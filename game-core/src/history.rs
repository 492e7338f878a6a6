use std::collections::BTreeMap;

use game_types::{GameResultRecord, PlayerHistoryEntry, PlayerPointsBreakdown, Role, Winner};
use serde::{Deserialize, Serialize};

use crate::scoring::dense_ranks;

/// Cumulative statistics keyed by player name, across every game played on
/// this device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerHistory {
    entries: BTreeMap<String, PlayerHistoryEntry>,
}

impl PlayerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished game into the history. Each player is credited a win
    /// when the winning team includes their role.
    pub fn record_game(&mut self, winner: Winner, breakdown: &[PlayerPointsBreakdown]) {
        for points in breakdown {
            let entry = self
                .entries
                .entry(points.name.clone())
                .or_insert_with(|| PlayerHistoryEntry {
                    name: points.name.clone(),
                    ..Default::default()
                });

            entry.games_played += 1;
            entry.total_points += points.total;
            if winner.includes(points.role) {
                match points.role {
                    Role::Civilian => entry.civilian_wins += 1,
                    Role::Imposter => entry.imposter_wins += 1,
                    Role::Spy => entry.spy_wins += 1,
                }
            }
        }
    }

    pub fn entry(&self, name: &str) -> Option<&PlayerHistoryEntry> {
        self.entries.get(name)
    }

    /// Entries by total points, highest first, paired with a dense rank
    pub fn leaderboard(&self) -> Vec<(u32, PlayerHistoryEntry)> {
        let mut entries: Vec<PlayerHistoryEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.name.cmp(&b.name))
        });

        let ranks = dense_ranks(&entries, |entry| entry.total_points);
        ranks.into_iter().zip(entries).collect()
    }

    pub fn remove(&mut self, name: &str) -> Option<PlayerHistoryEntry> {
        self.entries.remove(name)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Totals for one room, derived from its recorded game results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomHistory {
    pub games_played: u32,
    pub civilian_wins: u32,
    pub imposter_wins: u32,
    pub spy_wins: u32,
    pub points_by_player: BTreeMap<String, i32>,
}

impl RoomHistory {
    pub fn from_results(results: &[GameResultRecord]) -> Self {
        let mut history = Self::default();

        for result in results {
            history.games_played += 1;
            match result.winner {
                Winner::Civilians => history.civilian_wins += 1,
                Winner::Imposters => history.imposter_wins += 1,
                Winner::Spy => history.spy_wins += 1,
            }
            for player in &result.players {
                *history
                    .points_by_player
                    .entry(player.name.clone())
                    .or_insert(0) += player.points;
            }
        }

        history
    }

    /// Player totals, highest first, dense-ranked the same way game results are
    pub fn standings(&self) -> Vec<(u32, String, i32)> {
        let mut totals: Vec<(&String, &i32)> = self.points_by_player.iter().collect();
        totals.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut rank = 0;
        let mut previous = None;
        totals
            .into_iter()
            .map(|(name, total)| {
                if previous != Some(*total) {
                    rank += 1;
                    previous = Some(*total);
                }
                (rank, name.clone(), *total)
            })
            .collect()
    }
}
