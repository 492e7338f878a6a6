use async_trait::async_trait;
use game_types::{
    GameResultRecord, Participant, PrivateRole, RoomChange, RoomId, RoomInfo, SharedState,
    VoteEntry, VoteSubmission,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;

/// Backend a replicated room lives in.
///
/// Writes are plain last-writer-wins; only the host is expected to publish
/// shared state, record results or write private roles. Every write announces
/// a `RoomChange` to the room's subscribers, who re-fetch what they need.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self) -> Result<RoomInfo>;
    /// Resolve a room code to its id
    async fn join_room(&self, code: &str) -> Result<RoomId>;
    async fn delete_room(&self, room_id: RoomId) -> Result<()>;
    /// Remove rooms untouched for longer than `max_age`, returning how many went
    async fn delete_stale_rooms(&self, max_age: chrono::Duration) -> Result<u64>;

    async fn add_participant(&self, room_id: RoomId, name: &str, is_host: bool)
    -> Result<Participant>;
    async fn list_participants(&self, room_id: RoomId) -> Result<Vec<Participant>>;
    async fn find_participant(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
    ) -> Result<Option<Participant>>;
    async fn submit_guess(&self, room_id: RoomId, participant_ref: Uuid, guess: &str)
    -> Result<()>;
    async fn clear_guess(&self, room_id: RoomId, participant_ref: Uuid) -> Result<()>;

    async fn upsert_private_role(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
        role: &PrivateRole,
    ) -> Result<()>;
    /// `None` until the host has dealt this participant a role
    async fn fetch_private_role(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
    ) -> Result<Option<PrivateRole>>;

    async fn publish_shared_state(&self, room_id: RoomId, state: &SharedState) -> Result<()>;
    async fn fetch_shared_state(&self, room_id: RoomId) -> Result<Option<SharedState>>;

    /// Append-only; duplicates are stored as-is
    async fn submit_vote(&self, room_id: RoomId, vote: &VoteSubmission) -> Result<VoteEntry>;
    /// Oldest first, optionally narrowed to one game and one round
    async fn fetch_votes(
        &self,
        room_id: RoomId,
        game_number: Option<u32>,
        round: Option<u32>,
    ) -> Result<Vec<VoteEntry>>;

    async fn record_game_result(&self, result: &GameResultRecord) -> Result<()>;
    /// Oldest first
    async fn list_game_results(&self, room_id: RoomId) -> Result<Vec<GameResultRecord>>;

    /// Change feed for one room. Dropping the receiver unsubscribes.
    fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<RoomChange>;
}
