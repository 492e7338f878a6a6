mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use game_persistence::RoomStore;
use game_sync::{OnlineGame, SyncConfig, SyncError};
use game_types::{GamePhase, Role, Winner};

#[tokio::test]
async fn test_joiners_see_host_lobby() {
    let store = setup_store().await;
    let games = create_room(store.clone(), 2).await;

    let host = &games[0];
    assert!(host.is_host());
    assert_eq!(host.state().revision, 1);

    for guest in &games[1..] {
        assert!(!guest.is_host());
        assert_eq!(guest.room_id(), host.room_id());
        assert_eq!(guest.state().phase, GamePhase::Setup);
        assert_eq!(guest.state().revision, 1);
        assert_eq!(guest.resume_session().room_code, host.resume_session().room_code);
    }

    let participants = store.list_participants(host.room_id()).await.unwrap();
    assert_eq!(participants.len(), 3);
}

#[tokio::test]
async fn test_start_game_deals_private_roles() {
    let store = setup_store().await;
    let mut games = create_room(store, 2).await;

    games[0].start_game(1, 0, 0).await.unwrap();
    drain_all(&mut games).await;

    let host_state = games[0].state().clone();
    assert_eq!(host_state.phase, GamePhase::RevealRoles);
    assert_eq!(host_state.players.len(), 3);
    assert_eq!(host_state.count_role(Role::Imposter), 1);

    for guest in &games[1..] {
        assert_eq!(guest.state().phase, GamePhase::RevealRoles);
        assert_eq!(guest.state().game_number, host_state.game_number);

        let me = host_state.player(guest.participant().player_id).unwrap();
        let room = guest.state().room.as_ref().unwrap();
        assert_eq!(room.my_role, Some(me.role));
        assert_eq!(room.my_word.as_deref(), Some(me.word.as_str()));
    }
}

#[tokio::test]
async fn test_only_host_drives_transitions() {
    let store = setup_store().await;
    let mut games = create_room(store, 2).await;

    assert!(matches!(
        games[1].start_game(1, 0, 0).await,
        Err(SyncError::NotHost { .. })
    ));
    assert!(matches!(
        games[1].reveal_next_player().await,
        Err(SyncError::NotHost { .. })
    ));
    assert!(matches!(
        games[1].sync_votes().await,
        Err(SyncError::NotHost { .. })
    ));
}

#[tokio::test]
async fn test_invalid_setup_leaves_state_untouched() {
    let store = setup_store().await;
    let mut games = create_room(store, 2).await;

    let result = games[0].start_game(2, 0, 0).await;
    assert!(matches!(result, Err(SyncError::Setup(_))));

    let state = games[0].state();
    assert_eq!(state.phase, GamePhase::Setup);
    assert_eq!(state.revision, 1);
    assert!(state.players.is_empty());
}

#[tokio::test]
async fn test_votes_and_guess_finish_the_game() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;

    games[0].start_game(1, 0, 0).await.unwrap();
    for _ in 0..3 {
        games[0].reveal_next_player().await.unwrap();
    }
    for _ in 0..3 {
        games[0].next_player_turn(false).await.unwrap();
    }
    assert_eq!(games[0].state().phase, GamePhase::Voting);
    drain_all(&mut games).await;

    let players = games[0].state().players.clone();
    let imposter = players.iter().find(|p| p.role == Role::Imposter).unwrap().id;
    let civilian = players.iter().find(|p| p.role == Role::Civilian).unwrap().id;

    for game in &games {
        let voter = game.participant().player_id;
        let target = if voter == imposter { civilian } else { imposter };
        game.submit_vote(target).await.unwrap();
    }

    // The host applies the votes and closes the ballot once everyone voted
    drain(&mut games[0]).await;
    assert_eq!(games[0].state().phase, GamePhase::ImposterGuess);
    assert_eq!(games[0].state().eliminated_player_id, Some(imposter));
    assert_eq!(games[0].state().vote_history.len(), 3);

    drain_all(&mut games).await;
    let guesser = index_of(&games, imposter);
    games[guesser].submit_guess("  Ice Cream ").await.unwrap();
    if guesser != 0 {
        assert!(games[0].apply_pending_guess().await.unwrap());
    }

    let host = &games[0];
    assert_eq!(host.state().phase, GamePhase::Results);
    assert_eq!(host.state().winner, Some(Winner::Imposters));

    let results = store.list_game_results(host.room_id()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].winner, Winner::Imposters);
    assert_eq!(host.history().len(), 3);

    assert!(!games[0].record_result().await.unwrap());

    drain_all(&mut games).await;
    for guest in &games[1..] {
        assert_eq!(guest.state().phase, GamePhase::Results);
        assert_eq!(guest.state().winner, Some(Winner::Imposters));
    }
}

#[tokio::test]
async fn test_votes_are_applied_once() {
    let store = setup_store().await;
    let mut games = create_room(store, 2).await;

    games[0].start_game(1, 0, 0).await.unwrap();
    host_to_voting(&mut games).await;

    let target = games[0].participant().player_id;
    games[1].submit_vote(target).await.unwrap();

    assert_eq!(games[0].sync_votes().await.unwrap(), 1);
    assert_eq!(games[0].sync_votes().await.unwrap(), 0);
    assert_eq!(games[0].state().vote_history.len(), 1);
    assert_eq!(games[0].state().phase, GamePhase::Voting);
}

#[tokio::test]
async fn test_turn_timer_times_out_the_talker() {
    let store = setup_store().await;
    let mut games = create_room(store, 2).await;

    games[0].start_game(1, 0, 1).await.unwrap();
    for _ in 0..3 {
        games[0].reveal_next_player().await.unwrap();
    }
    let first_talker = games[0].session_mut().current_player().unwrap().id;

    let host = &mut games[0];
    tokio::time::timeout(Duration::from_secs(5), async {
        while host.state().timeout_history.is_empty() {
            host.pump().await.unwrap();
        }
    })
    .await
    .unwrap();

    let timeouts = &host.state().timeout_history;
    assert_eq!(timeouts[0].player_id, first_talker);
    assert_eq!(timeouts[0].round, 1);
}

#[tokio::test]
async fn test_resume_reconnects_participant() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;
    games[0].start_game(1, 0, 0).await.unwrap();

    let saved = games[2].resume_session();
    let expected_role = games[0]
        .state()
        .player(saved.participant_player_ref)
        .unwrap()
        .role;
    games[2].leave();
    assert!(!games[2].is_subscribed());

    let dyn_store: Arc<dyn RoomStore> = store;
    let resumed = OnlineGame::resume(dyn_store, test_words(), &saved, None, fast_config())
        .await
        .unwrap();

    assert_eq!(resumed.participant().participant_ref, saved.participant_ref);
    assert_eq!(resumed.state().phase, GamePhase::RevealRoles);
    assert_eq!(resumed.my_role(), Some(expected_role));
}

#[tokio::test]
async fn test_resume_into_deleted_room_is_stale() {
    let store = setup_store().await;
    let games = create_room(store.clone(), 1).await;
    let saved = games[1].resume_session();

    store.delete_room(saved.room_id).await.unwrap();

    let dyn_store: Arc<dyn RoomStore> = store;
    let result = OnlineGame::resume(dyn_store, test_words(), &saved, None, fast_config()).await;
    assert!(matches!(result, Err(SyncError::StaleSession { .. })));
}

#[tokio::test]
async fn test_room_deletion_ends_subscription() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 1).await;
    drain(&mut games[1]).await;

    store.delete_room(games[0].room_id()).await.unwrap();

    let result = games[1].pump().await;
    assert!(matches!(result, Err(SyncError::RoomDeleted(_))));
    assert!(!games[1].is_subscribed());
    assert!(!games[1].pump().await.unwrap());
}

#[tokio::test]
async fn test_resumed_host_keeps_applied_votes() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;
    games[0].start_game(1, 0, 0).await.unwrap();
    host_to_voting(&mut games).await;

    let target = games[0].participant().player_id;
    games[1].submit_vote(target).await.unwrap();
    games[2].submit_vote(target).await.unwrap();
    assert_eq!(games[0].sync_votes().await.unwrap(), 2);

    let snapshot = games[0].state().clone();
    let saved = games[0].resume_session();
    games[0].leave();

    let dyn_store: Arc<dyn RoomStore> = store;
    let mut host = OnlineGame::resume(
        dyn_store,
        test_words(),
        &saved,
        Some(snapshot.clone()),
        fast_config(),
    )
    .await
    .unwrap();

    assert!(host.is_host());
    assert_eq!(host.state().vote_history.len(), 2);
    assert_eq!(host.state().player(target).unwrap().votes, 2);
    assert_eq!(host.state().revision, snapshot.revision);
    assert_eq!(host.sync_votes().await.unwrap(), 0);

    // Votes cast after the reload still count
    let voter = games[1].participant().player_id;
    host.submit_vote(voter).await.unwrap();
    assert_eq!(host.sync_votes().await.unwrap(), 1);
    assert_eq!(host.state().vote_history.len(), 3);
}

#[tokio::test]
async fn test_votes_stay_with_their_game() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;

    games[0].start_game(1, 0, 0).await.unwrap();
    host_to_voting(&mut games).await;
    let imposter = vote_out_imposter(&mut games).await;

    drain_all(&mut games).await;
    let guesser = index_of(&games, imposter);
    games[guesser].submit_guess("definitely wrong").await.unwrap();
    if guesser != 0 {
        assert!(games[0].apply_pending_guess().await.unwrap());
    }
    assert_eq!(games[0].state().phase, GamePhase::Results);

    // Second game in the same room, back at round one with the same players
    games[0].play_again().await.unwrap();
    host_to_voting(&mut games).await;
    assert_eq!(games[0].state().game_number, 2);
    assert_eq!(games[0].state().current_round, 1);

    assert!(games[1].force_resync().await.unwrap().is_empty());
    assert_eq!(games[0].sync_votes().await.unwrap(), 0);
    assert!(games[0].state().vote_history.is_empty());

    let snapshot = games[0].state().clone();
    let saved = games[0].resume_session();
    games[0].leave();

    let dyn_store: Arc<dyn RoomStore> = store.clone();
    let host = OnlineGame::resume(dyn_store, test_words(), &saved, Some(snapshot), fast_config())
        .await
        .unwrap();
    assert!(host.state().vote_history.is_empty());
    assert!(host.state().players.iter().all(|p| p.votes == 0));

    let first_game = store
        .fetch_votes(saved.room_id, Some(1), None)
        .await
        .unwrap();
    assert_eq!(first_game.len(), 3);
}

#[tokio::test]
async fn test_stale_guesses_are_never_applied() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;
    let room_id = games[0].room_id();

    // Written before anyone had a role
    for guest in &games[1..] {
        store
            .submit_guess(room_id, guest.participant().participant_ref, "ice cream")
            .await
            .unwrap();
    }

    games[0].start_game(1, 0, 0).await.unwrap();
    let participants = store.list_participants(room_id).await.unwrap();
    assert!(participants.iter().all(|p| p.pending_guess.is_none()));

    for _ in 0..3 {
        games[0].reveal_next_player().await.unwrap();
    }
    drain_all(&mut games).await;
    assert_eq!(games[1].state().phase, GamePhase::Playing);

    let imposter = games[0]
        .state()
        .players
        .iter()
        .find(|p| p.role == Role::Imposter)
        .unwrap()
        .id;
    let guesser = index_of(&games, imposter);
    let bystander = (guesser + 1) % games.len();
    assert!(matches!(
        games[guesser].submit_guess("ice cream").await,
        Err(SyncError::NotGuesser)
    ));
    assert!(matches!(
        games[bystander].submit_guess("ice cream").await,
        Err(SyncError::NotGuesser)
    ));

    for _ in 0..3 {
        games[0].next_player_turn(false).await.unwrap();
    }
    vote_out_imposter(&mut games).await;

    assert!(!games[0].apply_pending_guess().await.unwrap());
    assert_eq!(games[0].state().phase, GamePhase::ImposterGuess);
    assert_eq!(games[0].state().winner, None);

    drain_all(&mut games).await;
    assert!(matches!(
        games[bystander].submit_guess("ice cream").await,
        Err(SyncError::NotGuesser)
    ));
}

#[tokio::test]
async fn test_late_joiner_does_not_wait_for_a_role() {
    let store = setup_store().await;
    let mut games = create_room(store.clone(), 2).await;
    games[0].start_game(1, 0, 0).await.unwrap();
    drain_all(&mut games).await;

    // Long enough that a role poll would outlast the timeout below
    let config = SyncConfig {
        role_poll_interval: Duration::from_secs(1),
        role_poll_attempts: 5,
        ..fast_config()
    };
    let code = games[0].resume_session().room_code;
    let dyn_store: Arc<dyn RoomStore> = store;
    let mut late = OnlineGame::join(dyn_store, test_words(), &code, "Late", config)
        .await
        .unwrap();
    assert_eq!(late.state().phase, GamePhase::RevealRoles);
    assert_eq!(late.my_role(), None);

    games[0].reveal_next_player().await.unwrap();

    let handled = tokio::time::timeout(Duration::from_millis(500), late.pump()).await;
    assert!(matches!(handled, Ok(Ok(true))));
    assert_eq!(late.state().revision, games[0].state().revision);
    assert_eq!(late.my_role(), None);
    assert!(late.state().player(late.participant().player_id).is_none());
}
