use std::collections::HashSet;
use std::sync::Arc;

use game_core::{GameSession, PlayerHistory, SetupError, VoteOutcome, WordBank};
use game_persistence::{RoomStore, StoreError};
use game_types::{
    GameMode, GamePhase, GameState, Participant, Player, PlayerId, ResumeSession, Role, RoomChange,
    RoomId, RoomIdentity, VoteEntry, VoteSubmission,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::replicator::{ApplyOutcome, Replicator, applied_vote_ids, apply_private_role};
use crate::timer::{TimerEvent, TurnTimer};
use crate::SyncConfig;

enum Incoming {
    Change(std::result::Result<RoomChange, RecvError>),
    Timer(TimerEvent),
}

/// One participant's view of a replicated game.
///
/// The host drives a full `GameSession` and publishes after every
/// transition. Everyone else only writes votes and guesses, and rebuilds
/// their state from the room's change feed.
pub struct OnlineGame {
    session: GameSession,
    store: Arc<dyn RoomStore>,
    replicator: Replicator,
    participant: Participant,
    config: SyncConfig,
    changes: Option<broadcast::Receiver<RoomChange>>,
    timer: Option<TurnTimer>,
    timer_key: Option<(PlayerId, u32)>,
    timer_tx: mpsc::Sender<TimerEvent>,
    timer_rx: mpsc::Receiver<TimerEvent>,
    applied_votes: HashSet<i32>,
    last_recorded_game: u32,
    history: PlayerHistory,
}

impl OnlineGame {
    /// Create a room and enter it as host
    pub async fn host(
        store: Arc<dyn RoomStore>,
        words: WordBank,
        name: &str,
        config: SyncConfig,
    ) -> Result<Self> {
        let room = store.create_room().await?;
        let participant = store.add_participant(room.room_id, name, true).await?;

        let mut game = Self::connect(store, words, room.room_code, participant, None, config);
        game.replicator.publish(&mut game.session.state).await?;
        info!(room_id = %game.room_id(), "Hosting room");
        Ok(game)
    }

    pub async fn join(
        store: Arc<dyn RoomStore>,
        words: WordBank,
        code: &str,
        name: &str,
        config: SyncConfig,
    ) -> Result<Self> {
        let room_id = store.join_room(code).await?;
        let participant = store.add_participant(room_id, name, false).await?;

        let code = code.trim().to_uppercase();
        let mut game = Self::connect(store, words, code, participant, None, config);
        game.force_resync().await?;
        info!(%room_id, "Joined room");
        Ok(game)
    }

    /// Reconnect from a saved session. A host passes its last local snapshot,
    /// since the shared row does not carry other players' roles. Fails with
    /// `StaleSession` when the room or participant is gone.
    pub async fn resume(
        store: Arc<dyn RoomStore>,
        words: WordBank,
        saved: &ResumeSession,
        snapshot: Option<GameState>,
        config: SyncConfig,
    ) -> Result<Self> {
        let stale = SyncError::StaleSession {
            room_id: saved.room_id,
        };
        let participant = match store
            .find_participant(saved.room_id, saved.participant_ref)
            .await
        {
            Ok(Some(participant)) => participant,
            Ok(None) | Err(StoreError::RoomNotFound(_)) => return Err(stale),
            Err(e) => return Err(e.into()),
        };

        let snapshot = snapshot.filter(|state| {
            participant.is_host
                && state
                    .room
                    .as_ref()
                    .is_some_and(|room| room.room_id == saved.room_id)
        });

        let mut game = Self::connect(
            store,
            words,
            saved.room_code.clone(),
            participant,
            snapshot,
            config,
        );
        if game.is_host() {
            game.restore_applied_votes().await?;
        }
        game.force_resync().await?;
        info!(room_id = %saved.room_id, is_host = game.is_host(), "Resumed room session");
        Ok(game)
    }

    fn connect(
        store: Arc<dyn RoomStore>,
        words: WordBank,
        room_code: String,
        participant: Participant,
        snapshot: Option<GameState>,
        config: SyncConfig,
    ) -> Self {
        let session = match snapshot {
            Some(state) => GameSession::from_state(state, words),
            None => {
                let mut session = GameSession::new(GameMode::Online, words);
                session.state.room = Some(RoomIdentity {
                    room_id: participant.room_id,
                    room_code,
                    is_host: participant.is_host,
                    participant_ref: participant.participant_ref,
                    player_id: participant.player_id,
                    my_role: None,
                    my_word: None,
                });
                session
            }
        };

        let replicator = Replicator::new(
            store.clone(),
            participant.room_id,
            participant.participant_ref,
            config.clone(),
        );
        let changes = Some(store.subscribe(participant.room_id));
        let (timer_tx, timer_rx) = mpsc::channel(32);
        let last_recorded_game = if session.state.phase == GamePhase::Results {
            session.state.game_number
        } else {
            0
        };

        Self {
            session,
            store,
            replicator,
            participant,
            config,
            changes,
            timer: None,
            timer_key: None,
            timer_tx,
            timer_rx,
            applied_votes: HashSet::new(),
            last_recorded_game,
            history: PlayerHistory::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.session.state
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn is_host(&self) -> bool {
        self.participant.is_host
    }

    pub fn room_id(&self) -> RoomId {
        self.participant.room_id
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn my_role(&self) -> Option<Role> {
        self.session.state.room.as_ref().and_then(|room| room.my_role)
    }

    pub fn history(&self) -> &PlayerHistory {
        &self.history
    }

    pub fn is_subscribed(&self) -> bool {
        self.changes.is_some()
    }

    /// What to save on the device to reconnect after a reload
    pub fn resume_session(&self) -> ResumeSession {
        let room_code = self
            .session
            .state
            .room
            .as_ref()
            .map(|room| room.room_code.clone())
            .unwrap_or_default();

        ResumeSession {
            room_id: self.participant.room_id,
            room_code,
            participant_name: self.participant.name.clone(),
            participant_ref: self.participant.participant_ref,
            participant_player_ref: self.participant.player_id,
            is_host: self.participant.is_host,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Stop listening to the room. The room itself is left as it is.
    pub fn leave(&mut self) {
        self.changes = None;
        self.cancel_timer();
        debug!(room_id = %self.room_id(), "Left room");
    }

    // Host transitions

    /// Deal roles to everyone currently in the room
    pub async fn start_game(
        &mut self,
        imposter_count: u32,
        spy_count: u32,
        round_duration: u32,
    ) -> Result<()> {
        self.require_host("start the game")?;
        let participants = self.store.list_participants(self.room_id()).await?;
        let roster: Vec<Player> = participants
            .iter()
            .map(|p| Player::new(p.player_id, p.name.clone()))
            .collect();
        let player_count = roster.len() as u32;

        self.host_transition("start the game", move |session| {
            session.configure(player_count, imposter_count, spy_count, round_duration)?;
            session.start_with_roster(roster)
        })
        .await
    }

    pub async fn reveal_next_player(&mut self) -> Result<()> {
        self.host_transition("reveal roles", |session| {
            session.reveal_next_player();
            Ok(())
        })
        .await
    }

    pub async fn next_player_turn(&mut self, timed_out: bool) -> Result<()> {
        self.host_transition("advance turns", |session| {
            session.next_player_turn(timed_out);
            Ok(())
        })
        .await
    }

    pub async fn resolve_votes(&mut self) -> Result<VoteOutcome> {
        let mut outcome = VoteOutcome::NoVotes;
        self.host_transition("resolve votes", |session| {
            outcome = session.resolve_votes();
            Ok(())
        })
        .await?;
        Ok(outcome)
    }

    pub async fn continue_after_tie(&mut self) -> Result<()> {
        self.host_transition("continue after a tie", |session| {
            session.continue_after_tie();
            Ok(())
        })
        .await
    }

    pub async fn process_elimination(&mut self) -> Result<()> {
        self.host_transition("process eliminations", |session| {
            session.process_elimination();
            Ok(())
        })
        .await
    }

    pub async fn play_again(&mut self) -> Result<()> {
        self.host_transition("start another game", |session| {
            session.play_again();
            Ok(())
        })
        .await
    }

    pub async fn reset_game(&mut self) -> Result<()> {
        self.host_transition("reset the game", |session| {
            session.reset_game();
            Ok(())
        })
        .await
    }

    // Participant writes

    /// Append this participant's vote for the current round
    pub async fn submit_vote(&self, target_id: PlayerId) -> Result<VoteEntry> {
        let vote = VoteSubmission {
            voter_id: self.participant.player_id,
            target_id,
            game_number: self.session.state.game_number,
            round: self.session.state.current_round,
        };
        self.store
            .submit_vote(self.room_id(), &vote)
            .await
            .inspect_err(|e| warn!(room_id = %self.room_id(), error = %e, "Failed to submit vote"))
            .map_err(SyncError::from)
    }

    /// Only the current guesser may guess. The host applies its own guess
    /// directly; everyone else leaves it on their participant row for the
    /// host to pick up.
    pub async fn submit_guess(&mut self, guess: &str) -> Result<()> {
        if self.session.guesser() != Some(self.participant.player_id) {
            return Err(SyncError::NotGuesser);
        }

        if self.is_host() {
            let guess = guess.to_string();
            return self
                .host_transition("guess", move |session| {
                    session.handle_imposter_guess(&guess);
                    Ok(())
                })
                .await;
        }

        self.store
            .submit_guess(self.room_id(), self.participant.participant_ref, guess)
            .await
            .inspect_err(|e| warn!(room_id = %self.room_id(), error = %e, "Failed to submit guess"))?;
        Ok(())
    }

    // Host bookkeeping

    /// Apply vote rows the host has not seen yet. Duplicate rows from the
    /// same voter are applied as they come.
    pub async fn sync_votes(&mut self) -> Result<usize> {
        self.require_host("apply votes")?;
        if self.session.state.phase != GamePhase::Voting {
            return Ok(0);
        }

        let game_number = self.session.state.game_number;
        let round = self.session.state.current_round;
        let votes = self.replicator.fetch_round_votes(game_number, round).await?;
        let before = self.session.state.clone();

        let mut applied = Vec::new();
        for vote in votes {
            if self.applied_votes.contains(&vote.id) {
                continue;
            }
            if self.session.vote(vote.voter_id, vote.target_id) {
                applied.push(vote.id);
            }
        }

        if applied.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.replicator.publish(&mut self.session.state).await {
            self.session.state = before;
            return Err(e);
        }

        debug!(round, applied = applied.len(), "Applied votes");
        let count = applied.len();
        self.applied_votes.extend(applied);
        Ok(count)
    }

    /// Apply a guess left by the imposter whose turn it is to guess
    pub async fn apply_pending_guess(&mut self) -> Result<bool> {
        self.require_host("apply guesses")?;
        let Some(guesser) = self.session.guesser() else {
            return Ok(false);
        };

        let participants = self.store.list_participants(self.room_id()).await?;
        let Some((participant_ref, guess)) = participants.into_iter().find_map(|p| {
            let guess = p.pending_guess?;
            (p.player_id == guesser).then_some((p.participant_ref, guess))
        }) else {
            return Ok(false);
        };

        self.host_transition("apply guesses", move |session| {
            session.handle_imposter_guess(&guess);
            Ok(())
        })
        .await?;

        if let Err(e) = self
            .store
            .clear_guess(self.room_id(), participant_ref)
            .await
        {
            warn!(room_id = %self.room_id(), error = %e, "Failed to clear applied guess");
        }
        Ok(true)
    }

    /// Store the finished game and fold it into the player history, once
    /// per game
    pub async fn record_result(&mut self) -> Result<bool> {
        self.require_host("record results")?;
        let state = &self.session.state;
        if state.phase != GamePhase::Results || self.last_recorded_game == state.game_number {
            return Ok(false);
        }
        let Some(record) = self.session.result_record(self.room_id()) else {
            return Ok(false);
        };

        self.store
            .record_game_result(&record)
            .await
            .inspect_err(|e| warn!(room_id = %self.room_id(), error = %e, "Failed to record game result"))?;

        self.history
            .record_game(record.winner, &self.session.calculate_points());
        self.last_recorded_game = record.game_number;
        Ok(true)
    }

    // Replication

    /// Re-read everything from the room. The host, being authoritative, only
    /// catches up on votes and guesses.
    pub async fn force_resync(&mut self) -> Result<Vec<VoteEntry>> {
        if self.is_host() {
            let state = &self.session.state;
            let votes = self
                .replicator
                .fetch_round_votes(state.game_number, state.current_round)
                .await?;
            self.sync_votes().await?;
            self.apply_pending_guess().await?;
            return Ok(votes);
        }

        let votes = self.replicator.force_resync(&mut self.session.state).await?;
        self.rearm_timer();
        Ok(votes)
    }

    pub async fn handle_change(&mut self, change: RoomChange) -> Result<()> {
        let host = self.is_host();
        match change {
            RoomChange::SharedState { .. } if !host => {
                let outcome = self.replicator.pull(&mut self.session.state, false).await?;
                if outcome == ApplyOutcome::Applied {
                    self.after_remote_update().await?;
                }
            }
            RoomChange::PrivateRole { participant_ref }
                if !host && participant_ref == self.participant.participant_ref =>
            {
                let role = self.replicator.fetch_own_role().await?;
                apply_private_role(&mut self.session.state, role);
            }
            RoomChange::Vote { game_number, round }
                if host
                    && game_number == self.session.state.game_number
                    && round == self.session.state.current_round =>
            {
                self.sync_votes().await?;
                if self.session.all_votes_in() {
                    self.resolve_votes().await?;
                }
            }
            RoomChange::Participants if host => {
                self.apply_pending_guess().await?;
            }
            RoomChange::RoomDeleted => {
                self.leave();
                return Err(SyncError::RoomDeleted(self.room_id()));
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn handle_timer(&mut self, event: TimerEvent) -> Result<()> {
        let active = self.session.current_player().map(|p| p.id);
        if self.session.state.phase != GamePhase::Playing || active != Some(event.player_id()) {
            return Ok(());
        }

        match event {
            TimerEvent::Tick { .. } => {
                self.session.tick_timer();
            }
            TimerEvent::Expired { player_id } if self.is_host() => {
                info!(%player_id, "Turn timed out");
                self.host_transition("time out a turn", move |session| {
                    session.expire_turn(player_id);
                    Ok(())
                })
                .await?;
            }
            TimerEvent::Expired { .. } => {}
        }
        Ok(())
    }

    /// Wait for the next room change or timer event and handle it. Returns
    /// `false` once the subscription has ended.
    pub async fn pump(&mut self) -> Result<bool> {
        let incoming = {
            let Some(changes) = self.changes.as_mut() else {
                return Ok(false);
            };
            let timer_rx = &mut self.timer_rx;
            tokio::select! {
                change = changes.recv() => Incoming::Change(change),
                Some(event) = timer_rx.recv() => Incoming::Timer(event),
            }
        };

        match incoming {
            Incoming::Change(Ok(change)) => self.handle_change(change).await?,
            Incoming::Change(Err(RecvError::Lagged(skipped))) => {
                warn!(skipped, "Room change feed lagged, resyncing");
                self.force_resync().await?;
            }
            Incoming::Change(Err(RecvError::Closed)) => {
                self.leave();
                return Ok(false);
            }
            Incoming::Timer(event) => self.handle_timer(event).await?,
        }
        Ok(true)
    }

    /// Mark the rows already folded into a restored snapshot, so a resumed
    /// host never counts them twice
    async fn restore_applied_votes(&mut self) -> Result<()> {
        let state = &self.session.state;
        if state.game_number == 0 {
            return Ok(());
        }
        let votes = self.replicator.fetch_game_votes(state.game_number).await?;
        self.applied_votes = applied_vote_ids(&state.vote_history, &votes);
        debug!(restored = self.applied_votes.len(), "Restored applied votes");
        Ok(())
    }

    fn require_host(&self, action: &'static str) -> Result<()> {
        if self.is_host() {
            Ok(())
        } else {
            Err(SyncError::NotHost { action })
        }
    }

    /// Apply a transition locally, then publish it. Private roles go out first
    /// whenever the transition dealt a new game. Nothing is kept if the store
    /// rejects the write.
    async fn host_transition<F>(&mut self, action: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut GameSession) -> std::result::Result<(), SetupError>,
    {
        self.require_host(action)?;
        let before = self.session.state.clone();

        if let Err(e) = apply(&mut self.session) {
            self.session.state = before;
            return Err(e.into());
        }

        let dealt = self.session.state.game_number != before.game_number;
        if let Err(e) = self.publish(dealt).await {
            self.session.state = before;
            return Err(e);
        }

        self.rearm_timer();
        if self.session.state.phase == GamePhase::Results {
            if let Err(e) = self.record_result().await {
                warn!(error = %e, "Result not recorded, will retry on next call");
            }
        }
        Ok(())
    }

    async fn publish(&mut self, dealt: bool) -> Result<()> {
        if dealt {
            let participants = self.store.list_participants(self.room_id()).await?;
            self.replicator
                .publish_private_roles(&self.session.state, &participants)
                .await?;

            // Guesses never carry over into a new deal
            for participant in participants.iter().filter(|p| p.pending_guess.is_some()) {
                self.store
                    .clear_guess(self.room_id(), participant.participant_ref)
                    .await?;
            }
        }
        self.replicator.publish(&mut self.session.state).await
    }

    async fn after_remote_update(&mut self) -> Result<()> {
        // Late joiners sit the current game out and have no role to wait for
        let state = &self.session.state;
        let dealt_in = state
            .room
            .as_ref()
            .is_some_and(|room| state.player(room.player_id).is_some());
        let needs_role = dealt_in
            && self.my_role().is_none()
            && !matches!(state.phase, GamePhase::Setup | GamePhase::OnlineLobby);
        if needs_role {
            let role = self.replicator.fetch_own_role().await?;
            apply_private_role(&mut self.session.state, role);
        }
        self.rearm_timer();
        Ok(())
    }

    /// Keep exactly one countdown running, for the active talker
    fn rearm_timer(&mut self) {
        let state = &self.session.state;
        let duration = state.round_duration;
        let wanted = match state.phase {
            GamePhase::Playing if duration > 0 => self
                .session
                .current_player()
                .map(|p| (p.id, state.current_round)),
            _ => None,
        };

        if wanted == self.timer_key && self.timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        self.cancel_timer();
        if let Some((player_id, round)) = wanted {
            self.timer = Some(TurnTimer::start(
                player_id,
                duration,
                self.config.tick_interval,
                self.config.turn_grace,
                self.timer_tx.clone(),
            ));
            self.timer_key = Some((player_id, round));
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.timer_key = None;
    }
}
