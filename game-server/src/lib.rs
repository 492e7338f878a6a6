use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use game_persistence::{RoomStore, StoreError};
use game_types::{
    ApiError, GameResultRecord, PrivateRole, RoomId, RoomInfo, SharedState, VoteSubmission,
};

pub mod config;
pub mod websocket;

const MAX_BODY_BYTES: u64 = 256 * 1024;

#[derive(Debug, Deserialize)]
struct VotesQuery {
    game: Option<u32>,
    round: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    #[serde(default)]
    pub is_host: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuessRequest {
    pub guess: String,
}

/// HTTP + WebSocket facade over a `RoomStore`
pub fn create_routes(
    store: Arc<dyn RoomStore>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let store_filter = warp::any().map(move || store.clone());

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // Rooms
    let create_room = warp::path!("rooms")
        .and(warp::post())
        .and(store_filter.clone())
        .and_then(handle_create_room);

    let join_room = warp::path!("rooms" / "code" / String)
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_join_room);

    let delete_room = warp::path!("rooms" / Uuid)
        .and(warp::delete())
        .and(store_filter.clone())
        .and_then(handle_delete_room);

    // Participants
    let add_participant = warp::path!("rooms" / Uuid / "participants")
        .and(warp::post())
        .and(json_body::<JoinRequest>())
        .and(store_filter.clone())
        .and_then(handle_add_participant);

    let list_participants = warp::path!("rooms" / Uuid / "participants")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_list_participants);

    let submit_guess = warp::path!("rooms" / Uuid / "participants" / Uuid / "guess")
        .and(warp::put())
        .and(json_body::<GuessRequest>())
        .and(store_filter.clone())
        .and_then(handle_submit_guess);

    let clear_guess = warp::path!("rooms" / Uuid / "participants" / Uuid / "guess")
        .and(warp::delete())
        .and(store_filter.clone())
        .and_then(handle_clear_guess);

    // Private roles
    let put_role = warp::path!("rooms" / Uuid / "roles" / Uuid)
        .and(warp::put())
        .and(json_body::<PrivateRole>())
        .and(store_filter.clone())
        .and_then(handle_put_role);

    let get_role = warp::path!("rooms" / Uuid / "roles" / Uuid)
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_get_role);

    // Shared state
    let put_state = warp::path!("rooms" / Uuid / "state")
        .and(warp::put())
        .and(json_body::<SharedState>())
        .and(store_filter.clone())
        .and_then(handle_put_state);

    let get_state = warp::path!("rooms" / Uuid / "state")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_get_state);

    // Votes
    let submit_vote = warp::path!("rooms" / Uuid / "votes")
        .and(warp::post())
        .and(json_body::<VoteSubmission>())
        .and(store_filter.clone())
        .and_then(handle_submit_vote);

    let list_votes = warp::path!("rooms" / Uuid / "votes")
        .and(warp::get())
        .and(warp::query::<VotesQuery>())
        .and(store_filter.clone())
        .and_then(handle_list_votes);

    // Results
    let record_result = warp::path!("rooms" / Uuid / "results")
        .and(warp::post())
        .and(json_body::<GameResultRecord>())
        .and(store_filter.clone())
        .and_then(handle_record_result);

    let list_results = warp::path!("rooms" / Uuid / "results")
        .and(warp::get())
        .and(store_filter.clone())
        .and_then(handle_list_results);

    // Change notifications
    let room_socket = warp::path!("rooms" / Uuid / "ws")
        .and(warp::ws())
        .and(store_filter.clone())
        .map(|room_id: RoomId, ws: warp::ws::Ws, store: Arc<dyn RoomStore>| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, store, room_id))
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    health
        .or(create_room)
        .or(join_room)
        .or(delete_room)
        .or(add_participant)
        .or(list_participants)
        .or(submit_guess)
        .or(clear_guess)
        .or(put_role)
        .or(get_role)
        .or(put_state)
        .or(get_state)
        .or(submit_vote)
        .or(list_votes)
        .or(record_result)
        .or(list_results)
        .or(room_socket)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("imposter_party"))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn api_error_reply(error: ApiError, status: StatusCode) -> Response {
    json_reply(&serde_json::json!({ "error": error }), status)
}

fn store_error_reply(err: StoreError) -> Response {
    match err {
        StoreError::RoomNotFound(room) => {
            api_error_reply(ApiError::RoomNotFound { room }, StatusCode::NOT_FOUND)
        }
        StoreError::ParticipantNotFound {
            participant_ref, ..
        } => api_error_reply(
            ApiError::ParticipantNotFound {
                participant_ref: participant_ref.to_string(),
            },
            StatusCode::NOT_FOUND,
        ),
        other => {
            tracing::error!("Room store failure: {}", other);
            api_error_reply(
                ApiError::InternalError {
                    message: other.to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

fn invalid_request(message: impl Into<String>) -> Response {
    api_error_reply(
        ApiError::InvalidRequest {
            message: message.into(),
        },
        StatusCode::BAD_REQUEST,
    )
}

async fn handle_create_room(store: Arc<dyn RoomStore>) -> Result<Response, Rejection> {
    Ok(match store.create_room().await {
        Ok(room) => json_reply(&room, StatusCode::CREATED),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_join_room(code: String, store: Arc<dyn RoomStore>) -> Result<Response, Rejection> {
    Ok(match store.join_room(&code).await {
        Ok(room_id) => json_reply(
            &RoomInfo {
                room_id,
                room_code: code.trim().to_uppercase(),
            },
            StatusCode::OK,
        ),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_delete_room(
    room_id: RoomId,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.delete_room(room_id).await {
        Ok(()) => no_content(),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_add_participant(
    room_id: RoomId,
    request: JoinRequest,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    if request.name.trim().is_empty() {
        return Ok(invalid_request("Participant name cannot be empty"));
    }

    Ok(
        match store
            .add_participant(room_id, &request.name, request.is_host)
            .await
        {
            Ok(participant) => json_reply(&participant, StatusCode::CREATED),
            Err(e) => store_error_reply(e),
        },
    )
}

async fn handle_list_participants(
    room_id: RoomId,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.list_participants(room_id).await {
        Ok(participants) => json_reply(&participants, StatusCode::OK),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_submit_guess(
    room_id: RoomId,
    participant_ref: Uuid,
    request: GuessRequest,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(
        match store
            .submit_guess(room_id, participant_ref, &request.guess)
            .await
        {
            Ok(()) => no_content(),
            Err(e) => store_error_reply(e),
        },
    )
}

async fn handle_clear_guess(
    room_id: RoomId,
    participant_ref: Uuid,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.clear_guess(room_id, participant_ref).await {
        Ok(()) => no_content(),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_put_role(
    room_id: RoomId,
    participant_ref: Uuid,
    role: PrivateRole,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(
        match store
            .upsert_private_role(room_id, participant_ref, &role)
            .await
        {
            Ok(()) => no_content(),
            Err(e) => store_error_reply(e),
        },
    )
}

async fn handle_get_role(
    room_id: RoomId,
    participant_ref: Uuid,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.fetch_private_role(room_id, participant_ref).await {
        Ok(Some(role)) => json_reply(&role, StatusCode::OK),
        Ok(None) => api_error_reply(ApiError::RoleNotReady, StatusCode::NOT_FOUND),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_put_state(
    room_id: RoomId,
    state: SharedState,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.publish_shared_state(room_id, &state).await {
        Ok(()) => no_content(),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_get_state(
    room_id: RoomId,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    // `null` until the host has published
    Ok(match store.fetch_shared_state(room_id).await {
        Ok(state) => json_reply(&state, StatusCode::OK),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_submit_vote(
    room_id: RoomId,
    vote: VoteSubmission,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.submit_vote(room_id, &vote).await {
        Ok(entry) => json_reply(&entry, StatusCode::CREATED),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_list_votes(
    room_id: RoomId,
    query: VotesQuery,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.fetch_votes(room_id, query.game, query.round).await {
        Ok(votes) => json_reply(&votes, StatusCode::OK),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_record_result(
    room_id: RoomId,
    result: GameResultRecord,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    if result.room_id != room_id {
        return Ok(invalid_request("Result belongs to a different room"));
    }

    Ok(match store.record_game_result(&result).await {
        Ok(()) => no_content(),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_list_results(
    room_id: RoomId,
    store: Arc<dyn RoomStore>,
) -> Result<Response, Rejection> {
    Ok(match store.list_game_results(room_id).await {
        Ok(results) => json_reply(&results, StatusCode::OK),
        Err(e) => store_error_reply(e),
    })
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(api_error_reply(
            ApiError::InvalidRequest {
                message: "Not found".to_string(),
            },
            StatusCode::NOT_FOUND,
        ));
    }
    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(invalid_request(format!("Invalid request body: {}", e)));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(api_error_reply(
            ApiError::InvalidRequest {
                message: "Request body too large".to_string(),
            },
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(api_error_reply(
            ApiError::InvalidRequest {
                message: "Method not allowed".to_string(),
            },
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }

    tracing::warn!("Unhandled rejection: {:?}", err);
    Ok(api_error_reply(
        ApiError::InternalError {
            message: "Unhandled request".to_string(),
        },
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}
