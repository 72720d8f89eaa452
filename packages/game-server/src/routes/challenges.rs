use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    error::ApiError, middleware::auth::AuthenticatedUser, realtime::events::ServerEvent,
    state::AppState,
};
use shared::models::challenge::Challenge;
use shared::models::game::TimeControl;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/challenges", get(list_challenges).post(create_challenge))
        .route("/challenges/{challenge_id}/respond", post(respond_to_challenge))
}

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    pub challenged_id: String,
    pub time_control: TimeControl,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub challenge: Challenge,
    pub game_id: Option<String>,
}

async fn create_challenge(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<Challenge>), ApiError> {
    let challenge = state
        .challenge_service
        .create_challenge(
            &authenticated_user.user_id,
            &payload.challenged_id,
            payload.time_control,
        )
        .await
        .map_err(|e| {
            error!(
                "Failed to create challenge {} -> {}: {}",
                authenticated_user.user_id, payload.challenged_id, e
            );
            ApiError::from(e)
        })?;

    state.hub.send_to_user(
        &challenge.challenged_id,
        &ServerEvent::ChallengeReceived {
            challenge: challenge.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(challenge)))
}

async fn respond_to_challenge(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Path(challenge_id): Path<String>,
    Json(payload): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, ApiError> {
    let response = state
        .challenge_service
        .respond(&challenge_id, &authenticated_user.user_id, payload.accept)
        .await
        .map_err(|e| {
            error!("Failed to answer challenge {}: {}", challenge_id, e);
            ApiError::from(e)
        })?;

    let challenge = response.challenge;
    let game_id = response.game.map(|game| game.game_id);
    let event = match &game_id {
        Some(game_id) => ServerEvent::ChallengeAccepted {
            challenge: challenge.clone(),
            game_id: game_id.clone(),
        },
        None => ServerEvent::ChallengeRejected {
            challenge: challenge.clone(),
        },
    };
    let delivered = state.hub.send_to_user(&challenge.challenger_id, &event);
    debug!(
        "Challenge {} answer reached {} connection(s)",
        challenge.challenge_id, delivered
    );

    Ok(Json(RespondResponse { challenge, game_id }))
}

async fn list_challenges(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    state
        .challenge_service
        .list_pending(&authenticated_user.user_id)
        .await
        .map(Json)
        .map_err(ApiError::from)
}
