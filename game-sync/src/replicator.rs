use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use game_persistence::RoomStore;
use game_types::{
    GamePhase, GameState, Participant, Player, PlayerId, PrivateRole, RoomId, SharedState,
    VoteEntry, VoteRecord,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::SyncConfig;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Older than (or equal to) what this client already holds
    Stale,
    /// The host keeps its freshly dealt words while revealing roles
    SkippedHostReveal,
}

/// Moves `GameState` between this client and the room store.
///
/// The host publishes the public projection; everyone else merges it back,
/// keeping their own role and word, which only ever come from the private
/// role table.
pub struct Replicator {
    store: Arc<dyn RoomStore>,
    room_id: RoomId,
    participant_ref: Uuid,
    config: SyncConfig,
}

impl Replicator {
    pub fn new(
        store: Arc<dyn RoomStore>,
        room_id: RoomId,
        participant_ref: Uuid,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            room_id,
            participant_ref,
            config,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Write every participant's role and word. Runs before the shared state
    /// is published so nobody sees `reveal-roles` without a role to read.
    pub async fn publish_private_roles(
        &self,
        state: &GameState,
        participants: &[Participant],
    ) -> Result<()> {
        for participant in participants {
            let Some(player) = state.player(participant.player_id) else {
                continue;
            };
            let role = PrivateRole {
                role: player.role,
                word: player.word.clone(),
            };
            self.store
                .upsert_private_role(self.room_id, participant.participant_ref, &role)
                .await
                .inspect_err(|e| {
                    warn!(room_id = %self.room_id, participant = %participant.participant_ref, error = %e, "Failed to write private role");
                })?;
        }
        Ok(())
    }

    /// Bump the revision and publish the public projection
    pub async fn publish(&self, state: &mut GameState) -> Result<()> {
        state.revision += 1;
        let shared = SharedState::from(&*state);

        if let Err(e) = self.store.publish_shared_state(self.room_id, &shared).await {
            state.revision -= 1;
            warn!(room_id = %self.room_id, error = %e, "Failed to publish shared state");
            return Err(e.into());
        }
        Ok(())
    }

    /// Fetch the shared row and merge it. `force` bypasses the revision and
    /// host checks, for reconnects.
    pub async fn pull(&self, state: &mut GameState, force: bool) -> Result<ApplyOutcome> {
        let shared = self
            .store
            .fetch_shared_state(self.room_id)
            .await
            .inspect_err(|e| warn!(room_id = %self.room_id, error = %e, "Failed to fetch shared state"))?;

        match shared {
            Some(shared) => Ok(apply_shared_state(state, shared, force)),
            None => Ok(ApplyOutcome::Stale),
        }
    }

    /// Read this participant's role, re-polling while the host is still
    /// dealing
    pub async fn fetch_own_role(&self) -> Result<PrivateRole> {
        let attempts = self.config.role_poll_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(role) = self
                .store
                .fetch_private_role(self.room_id, self.participant_ref)
                .await?
            {
                return Ok(role);
            }
            debug!(attempt, "Private role not ready yet");
            if attempt < attempts {
                tokio::time::sleep(self.config.role_poll_interval).await;
            }
        }

        Err(SyncError::RoleNotReady { attempts })
    }

    pub async fn fetch_round_votes(&self, game_number: u32, round: u32) -> Result<Vec<VoteEntry>> {
        Ok(self
            .store
            .fetch_votes(self.room_id, Some(game_number), Some(round))
            .await?)
    }

    pub async fn fetch_game_votes(&self, game_number: u32) -> Result<Vec<VoteEntry>> {
        Ok(self
            .store
            .fetch_votes(self.room_id, Some(game_number), None)
            .await?)
    }

    /// Shared state, own role and the current round's votes, all re-read.
    /// A missing role is not an error here; the lobby has none yet.
    pub async fn force_resync(&self, state: &mut GameState) -> Result<Vec<VoteEntry>> {
        self.pull(state, true).await?;

        if let Some(role) = self
            .store
            .fetch_private_role(self.room_id, self.participant_ref)
            .await?
        {
            apply_private_role(state, role);
        }

        self.fetch_round_votes(state.game_number, state.current_round)
            .await
    }
}

/// Merge a published projection into local state
pub fn apply_shared_state(state: &mut GameState, shared: SharedState, force: bool) -> ApplyOutcome {
    if !force {
        if state.is_host() && state.phase == GamePhase::RevealRoles {
            return ApplyOutcome::SkippedHostReveal;
        }
        if shared.revision <= state.revision {
            return ApplyOutcome::Stale;
        }
    }

    let new_deal = shared.game_number != state.game_number;
    let me = state.room.as_mut().map(|room| {
        if new_deal {
            room.my_role = None;
            room.my_word = None;
        }
        (room.player_id, room.my_role, room.my_word.clone())
    });

    let roster = shared.final_roster.unwrap_or_default();
    state.players = shared
        .players
        .iter()
        .map(|public| {
            let mut player = Player::new(public.id, public.name.clone());
            player.voted_for = public.voted_for;
            player.votes = public.votes;

            if let Some(full) = roster.iter().find(|p| p.id == public.id) {
                player.role = full.role;
                player.word = full.word.clone();
            }
            if let Some((player_id, Some(role), word)) = &me {
                if *player_id == public.id {
                    player.role = *role;
                    player.word = word.clone().unwrap_or_default();
                }
            }
            player
        })
        .collect();

    if !roster.is_empty() {
        state.all_players_snapshot = roster;
    } else if new_deal {
        state.all_players_snapshot.clear();
    }

    state.phase = shared.phase;
    state.player_count = shared.player_count;
    state.imposter_count = shared.imposter_count;
    state.spy_count = shared.spy_count;
    state.round_duration = shared.round_duration;
    state.current_round = shared.current_round;
    state.current_player_index = shared.current_player_index;
    state.current_reveal_index = shared.current_reveal_index;
    state.player_turn_timer = shared.player_turn_timer;
    state.eliminated_player_id = shared.eliminated_player_id;
    state.civilian_word = shared.civilian_word;
    state.spy_word = shared.spy_word;
    state.imposter_hint = shared.imposter_hint;
    state.vote_history = shared.vote_history;
    state.elimination_history = shared.elimination_history;
    state.timeout_history = shared.timeout_history;
    state.winner = shared.winner;
    state.game_number = shared.game_number;
    state.revision = shared.revision;

    ApplyOutcome::Applied
}

pub fn apply_private_role(state: &mut GameState, role: PrivateRole) {
    let Some(room) = state.room.as_mut() else {
        return;
    };
    room.my_role = Some(role.role);
    room.my_word = Some(role.word.clone());

    let player_id = room.player_id;
    if let Some(player) = state.players.iter_mut().find(|p| p.id == player_id) {
        player.role = role.role;
        player.word = role.word;
    }
}

/// Votes per target for one round of one game, derived from the vote log
pub fn tally_votes(votes: &[VoteEntry], game_number: u32, round: u32) -> HashMap<PlayerId, u32> {
    let mut tally = HashMap::new();
    for vote in votes
        .iter()
        .filter(|v| v.game_number == game_number && v.round == round)
    {
        *tally.entry(vote.target_id).or_insert(0) += 1;
    }
    tally
}

/// Ids of the vote rows already folded into `history`, matched oldest first
/// by voter, target and round. Lets a resumed host skip rows it applied
/// before the reload.
pub fn applied_vote_ids(history: &[VoteRecord], votes: &[VoteEntry]) -> HashSet<i32> {
    let mut unmatched: HashMap<(PlayerId, PlayerId, u32), usize> = HashMap::new();
    for record in history {
        *unmatched
            .entry((record.voter_id, record.target_id, record.round))
            .or_insert(0) += 1;
    }

    let mut ordered: Vec<&VoteEntry> = votes.iter().collect();
    ordered.sort_by_key(|v| v.id);

    let mut applied = HashSet::new();
    for vote in ordered {
        if let Some(remaining) = unmatched.get_mut(&(vote.voter_id, vote.target_id, vote.round)) {
            if *remaining > 0 {
                *remaining -= 1;
                applied.insert(vote.id);
            }
        }
    }
    applied
}
