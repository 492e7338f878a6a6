use std::str::FromStr;

use async_trait::async_trait;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::change_feed::ChangeFeed;
use crate::entities::{
    game_results, prelude::*, private_roles, room_participants, rooms, votes,
};
use crate::error::{Result, StoreError};
use crate::store::RoomStore;
use game_types::{
    GameResultRecord, Participant, PrivateRole, Role, RoomChange, RoomId, RoomInfo, SharedState,
    VoteEntry, VoteSubmission,
};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LENGTH: usize = 6;
const ROOM_CODE_ATTEMPTS: u32 = 10;

/// `RoomStore` over a sea-orm database, with an in-process change feed
pub struct DbRoomStore {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl DbRoomStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn generate_room_code() -> String {
        let mut rng = rand::thread_rng();
        (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect()
    }

    fn private_role_key(room_id: RoomId, participant_ref: Uuid) -> String {
        format!("{}:{}", room_id, participant_ref)
    }

    fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
        chrono::Utc::now().into()
    }

    fn model_to_participant(model: room_participants::Model) -> Participant {
        Participant {
            participant_ref: model.participant_ref,
            room_id: model.room_id,
            name: model.name,
            player_id: model.player_id,
            is_host: model.is_host,
            pending_guess: model.pending_guess,
            joined_at: model.joined_at.to_rfc3339(),
        }
    }

    fn model_to_vote(model: votes::Model) -> VoteEntry {
        VoteEntry {
            id: model.id,
            room_id: model.room_id,
            voter_id: model.voter_id,
            target_id: model.target_id,
            game_number: model.game_number.max(0) as u32,
            round: model.round.max(0) as u32,
            created_at: model.created_at.to_rfc3339(),
        }
    }

    async fn room_model(&self, room_id: RoomId) -> Result<rooms::Model> {
        Rooms::find_by_id(room_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))
    }

    async fn participant_model(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
    ) -> Result<room_participants::Model> {
        RoomParticipants::find_by_id(participant_ref)
            .filter(room_participants::Column::RoomId.eq(room_id))
            .one(&self.db)
            .await?
            .ok_or(StoreError::ParticipantNotFound {
                room_id,
                participant_ref,
            })
    }

    async fn touch_room(&self, room: rooms::Model) -> Result<()> {
        let mut active: rooms::ActiveModel = room.into();
        active.updated_at = ActiveValue::Set(Self::now());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn set_pending_guess(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
        guess: Option<String>,
    ) -> Result<()> {
        let participant = self.participant_model(room_id, participant_ref).await?;
        let mut active: room_participants::ActiveModel = participant.into();
        active.pending_guess = ActiveValue::Set(guess);
        active.update(&self.db).await?;

        self.feed.notify(room_id, RoomChange::Participants);
        Ok(())
    }
}

#[async_trait]
impl RoomStore for DbRoomStore {
    async fn create_room(&self) -> Result<RoomInfo> {
        for _ in 0..ROOM_CODE_ATTEMPTS {
            let code = Self::generate_room_code();
            let taken = Rooms::find()
                .filter(rooms::Column::Code.eq(code.as_str()))
                .one(&self.db)
                .await?
                .is_some();
            if taken {
                continue;
            }

            let room_id = Uuid::new_v4();
            let now = Self::now();
            let room = rooms::ActiveModel {
                id: ActiveValue::Set(room_id),
                code: ActiveValue::Set(code.clone()),
                state_json: ActiveValue::Set(None),
                revision: ActiveValue::Set(0),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            Rooms::insert(room).exec(&self.db).await?;

            info!(%room_id, room_code = %code, "Room created");
            return Ok(RoomInfo {
                room_id,
                room_code: code,
            });
        }

        Err(StoreError::RoomCodeExhausted {
            attempts: ROOM_CODE_ATTEMPTS,
        })
    }

    async fn join_room(&self, code: &str) -> Result<RoomId> {
        let code = code.trim().to_uppercase();
        let room = Rooms::find()
            .filter(rooms::Column::Code.eq(code.as_str()))
            .one(&self.db)
            .await?
            .ok_or(StoreError::RoomNotFound(code))?;
        Ok(room.id)
    }

    async fn delete_room(&self, room_id: RoomId) -> Result<()> {
        self.room_model(room_id).await?;

        let txn = self.db.begin().await?;
        Votes::delete_many()
            .filter(votes::Column::RoomId.eq(room_id))
            .exec(&txn)
            .await?;
        PrivateRoles::delete_many()
            .filter(private_roles::Column::RoomId.eq(room_id))
            .exec(&txn)
            .await?;
        RoomParticipants::delete_many()
            .filter(room_participants::Column::RoomId.eq(room_id))
            .exec(&txn)
            .await?;
        GameResults::delete_many()
            .filter(game_results::Column::RoomId.eq(room_id))
            .exec(&txn)
            .await?;
        Rooms::delete_by_id(room_id).exec(&txn).await?;
        txn.commit().await?;

        info!(%room_id, "Room deleted");
        self.feed.notify(room_id, RoomChange::RoomDeleted);
        self.feed.close(room_id);
        Ok(())
    }

    async fn delete_stale_rooms(&self, max_age: chrono::Duration) -> Result<u64> {
        let cutoff: sea_orm::prelude::DateTimeWithTimeZone = (chrono::Utc::now() - max_age).into();
        let stale = Rooms::find()
            .filter(rooms::Column::UpdatedAt.lt(cutoff))
            .all(&self.db)
            .await?;

        let mut removed = 0;
        for room in stale {
            self.delete_room(room.id).await?;
            removed += 1;
        }

        if removed > 0 {
            info!(removed, "Deleted stale rooms");
        }
        Ok(removed)
    }

    async fn add_participant(
        &self,
        room_id: RoomId,
        name: &str,
        is_host: bool,
    ) -> Result<Participant> {
        let room = self.room_model(room_id).await?;

        let participant = room_participants::ActiveModel {
            participant_ref: ActiveValue::Set(Uuid::new_v4()),
            room_id: ActiveValue::Set(room_id),
            name: ActiveValue::Set(name.trim().to_string()),
            player_id: ActiveValue::Set(Uuid::new_v4()),
            is_host: ActiveValue::Set(is_host),
            pending_guess: ActiveValue::Set(None),
            joined_at: ActiveValue::Set(Self::now()),
        };
        let model = participant.insert(&self.db).await?;
        self.touch_room(room).await?;

        debug!(%room_id, participant = %model.participant_ref, is_host, "Participant joined");
        self.feed.notify(room_id, RoomChange::Participants);
        Ok(Self::model_to_participant(model))
    }

    async fn list_participants(&self, room_id: RoomId) -> Result<Vec<Participant>> {
        self.room_model(room_id).await?;
        let participants = RoomParticipants::find()
            .filter(room_participants::Column::RoomId.eq(room_id))
            .order_by_asc(room_participants::Column::JoinedAt)
            .all(&self.db)
            .await?;

        Ok(participants
            .into_iter()
            .map(Self::model_to_participant)
            .collect())
    }

    async fn find_participant(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
    ) -> Result<Option<Participant>> {
        match self.participant_model(room_id, participant_ref).await {
            Ok(model) => Ok(Some(Self::model_to_participant(model))),
            Err(StoreError::ParticipantNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submit_guess(&self, room_id: RoomId, participant_ref: Uuid, guess: &str) -> Result<()> {
        self.set_pending_guess(room_id, participant_ref, Some(guess.to_string()))
            .await
    }

    async fn clear_guess(&self, room_id: RoomId, participant_ref: Uuid) -> Result<()> {
        self.set_pending_guess(room_id, participant_ref, None).await
    }

    async fn upsert_private_role(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
        role: &PrivateRole,
    ) -> Result<()> {
        self.room_model(room_id).await?;
        let key = Self::private_role_key(room_id, participant_ref);

        match PrivateRoles::find_by_id(key.clone()).one(&self.db).await? {
            Some(existing) => {
                let mut active: private_roles::ActiveModel = existing.into();
                active.role = ActiveValue::Set(role.role.as_str().to_string());
                active.word = ActiveValue::Set(role.word.clone());
                active.updated_at = ActiveValue::Set(Self::now());
                active.update(&self.db).await?;
            }
            None => {
                let active = private_roles::ActiveModel {
                    id: ActiveValue::Set(key),
                    room_id: ActiveValue::Set(room_id),
                    participant_ref: ActiveValue::Set(participant_ref),
                    role: ActiveValue::Set(role.role.as_str().to_string()),
                    word: ActiveValue::Set(role.word.clone()),
                    updated_at: ActiveValue::Set(Self::now()),
                };
                active.insert(&self.db).await?;
            }
        }

        self.feed
            .notify(room_id, RoomChange::PrivateRole { participant_ref });
        Ok(())
    }

    async fn fetch_private_role(
        &self,
        room_id: RoomId,
        participant_ref: Uuid,
    ) -> Result<Option<PrivateRole>> {
        let key = Self::private_role_key(room_id, participant_ref);
        let Some(model) = PrivateRoles::find_by_id(key).one(&self.db).await? else {
            return Ok(None);
        };

        let role = Role::from_str(&model.role).map_err(StoreError::CorruptedData)?;
        Ok(Some(PrivateRole {
            role,
            word: model.word,
        }))
    }

    async fn publish_shared_state(&self, room_id: RoomId, state: &SharedState) -> Result<()> {
        let room = self.room_model(room_id).await?;
        let json = serde_json::to_string(state)?;

        let mut active: rooms::ActiveModel = room.into();
        active.state_json = ActiveValue::Set(Some(json));
        active.revision = ActiveValue::Set(state.revision as i32);
        active.updated_at = ActiveValue::Set(Self::now());
        active.update(&self.db).await?;

        debug!(%room_id, revision = state.revision, phase = ?state.phase, "Shared state published");
        self.feed.notify(
            room_id,
            RoomChange::SharedState {
                revision: state.revision,
            },
        );
        Ok(())
    }

    async fn fetch_shared_state(&self, room_id: RoomId) -> Result<Option<SharedState>> {
        let room = self.room_model(room_id).await?;
        room.state_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn submit_vote(&self, room_id: RoomId, vote: &VoteSubmission) -> Result<VoteEntry> {
        self.room_model(room_id).await?;

        let active = votes::ActiveModel {
            room_id: ActiveValue::Set(room_id),
            voter_id: ActiveValue::Set(vote.voter_id),
            target_id: ActiveValue::Set(vote.target_id),
            game_number: ActiveValue::Set(vote.game_number as i32),
            round: ActiveValue::Set(vote.round as i32),
            created_at: ActiveValue::Set(Self::now()),
            ..Default::default()
        };
        let model = active.insert(&self.db).await?;

        debug!(%room_id, voter = %vote.voter_id, game = vote.game_number, round = vote.round, "Vote submitted");
        self.feed.notify(
            room_id,
            RoomChange::Vote {
                game_number: vote.game_number,
                round: vote.round,
            },
        );
        Ok(Self::model_to_vote(model))
    }

    async fn fetch_votes(
        &self,
        room_id: RoomId,
        game_number: Option<u32>,
        round: Option<u32>,
    ) -> Result<Vec<VoteEntry>> {
        let mut query = Votes::find().filter(votes::Column::RoomId.eq(room_id));
        if let Some(game_number) = game_number {
            query = query.filter(votes::Column::GameNumber.eq(game_number as i32));
        }
        if let Some(round) = round {
            query = query.filter(votes::Column::Round.eq(round as i32));
        }

        let votes = query.order_by_asc(votes::Column::Id).all(&self.db).await?;
        Ok(votes.into_iter().map(Self::model_to_vote).collect())
    }

    async fn record_game_result(&self, result: &GameResultRecord) -> Result<()> {
        let room = self.room_model(result.room_id).await?;

        let active = game_results::ActiveModel {
            room_id: ActiveValue::Set(result.room_id),
            game_number: ActiveValue::Set(result.game_number as i32),
            winner: ActiveValue::Set(result.winner.as_str().to_string()),
            results_json: ActiveValue::Set(serde_json::to_string(result)?),
            created_at: ActiveValue::Set(Self::now()),
            ..Default::default()
        };
        active.insert(&self.db).await?;
        self.touch_room(room).await?;

        info!(room_id = %result.room_id, game_number = result.game_number, winner = ?result.winner, "Game result recorded");
        self.feed.notify(
            result.room_id,
            RoomChange::GameResult {
                game_number: result.game_number,
            },
        );
        Ok(())
    }

    async fn list_game_results(&self, room_id: RoomId) -> Result<Vec<GameResultRecord>> {
        let rows = GameResults::find()
            .filter(game_results::Column::RoomId.eq(room_id))
            .order_by_asc(game_results::Column::Id)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| serde_json::from_str(&row.results_json).map_err(StoreError::from))
            .collect()
    }

    fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<RoomChange> {
        self.feed.subscribe(room_id)
    }
}
