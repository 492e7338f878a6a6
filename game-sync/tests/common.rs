#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use game_core::WordBank;
use game_persistence::{DbRoomStore, RoomStore, connect_to_memory_database};
use game_sync::{OnlineGame, SyncConfig};
use game_types::{GamePhase, Role};
use migration::{Migrator, MigratorTrait};

pub async fn setup_store() -> Arc<DbRoomStore> {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(DbRoomStore::new(db))
}

pub fn test_words() -> WordBank {
    WordBank::from_word_list("ice cream | frozen yogurt | dessert").unwrap()
}

/// Short intervals so timer and polling tests finish quickly
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        tick_interval: Duration::from_millis(5),
        turn_grace: Duration::from_millis(5),
        role_poll_interval: Duration::from_millis(5),
        role_poll_attempts: 20,
    }
}

/// A host plus `joiners` other participants, all in the same room
pub async fn create_room(store: Arc<DbRoomStore>, joiners: usize) -> Vec<OnlineGame> {
    let dyn_store: Arc<dyn RoomStore> = store;
    let host = OnlineGame::host(dyn_store.clone(), test_words(), "Host", fast_config())
        .await
        .unwrap();
    let code = host.resume_session().room_code;

    let mut games = vec![host];
    for i in 0..joiners {
        let name = format!("Guest{}", i + 1);
        let game = OnlineGame::join(dyn_store.clone(), test_words(), &code, &name, fast_config())
            .await
            .unwrap();
        games.push(game);
    }
    games
}

/// Handle queued room changes until the feed goes quiet
pub async fn drain(game: &mut OnlineGame) {
    while let Ok(result) = tokio::time::timeout(Duration::from_millis(50), game.pump()).await {
        if !result.unwrap() {
            break;
        }
    }
}

pub async fn drain_all(games: &mut [OnlineGame]) {
    for game in games.iter_mut() {
        drain(game).await;
    }
}

/// Host walks the freshly dealt game through reveals and talking turns,
/// then everyone catches up
pub async fn host_to_voting(games: &mut [OnlineGame]) {
    let players = games[0].state().players.len();
    for _ in 0..players {
        games[0].reveal_next_player().await.unwrap();
    }
    for _ in 0..players {
        games[0].next_player_turn(false).await.unwrap();
    }
    assert_eq!(games[0].state().phase, GamePhase::Voting);
    drain_all(games).await;
}

/// Everyone votes for the imposter, who votes for someone else. Returns the
/// imposter once the host has closed the ballot.
pub async fn vote_out_imposter(games: &mut [OnlineGame]) -> uuid::Uuid {
    drain_all(games).await;
    let players = games[0].state().players.clone();
    let imposter = players.iter().find(|p| p.role == Role::Imposter).unwrap().id;
    let other = players.iter().find(|p| p.id != imposter).unwrap().id;

    for game in games.iter() {
        let voter = game.participant().player_id;
        let target = if voter == imposter { other } else { imposter };
        game.submit_vote(target).await.unwrap();
    }
    drain(&mut games[0]).await;
    assert_eq!(games[0].state().phase, GamePhase::ImposterGuess);
    imposter
}

/// Index of the game controlled by the given player
pub fn index_of(games: &[OnlineGame], player_id: uuid::Uuid) -> usize {
    games
        .iter()
        .position(|g| g.participant().player_id == player_id)
        .unwrap()
}
