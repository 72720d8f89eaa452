use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use crate::{
    error::ApiError, middleware::auth::AuthenticatedUser, realtime::events::ServerEvent,
    state::AppState,
};
use shared::models::user::UserProfile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/friends", get(list_friends))
        .route("/friends/requests", post(send_request))
        .route("/friends/requests/respond", post(respond_to_request))
}

#[derive(Debug, Deserialize)]
pub struct FriendRequestPayload {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondPayload {
    pub from_id: String,
    pub accept: bool,
}

async fn send_request(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<FriendRequestPayload>,
) -> Result<StatusCode, ApiError> {
    let sender = &authenticated_user.user_id;
    state
        .friend_service
        .send_request(sender, &payload.user_id)
        .await
        .map_err(|e| {
            error!(
                "Failed to send friend request {} -> {}: {}",
                sender, payload.user_id, e
            );
            ApiError::from(e)
        })?;

    let profile = state.user_service.get_user_by_id(sender).await?;
    state.hub.send_to_user(
        &payload.user_id,
        &ServerEvent::FriendRequestReceived {
            from: UserProfile::from(&profile),
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn respond_to_request(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<RespondPayload>,
) -> Result<StatusCode, ApiError> {
    let user = state
        .friend_service
        .respond(&authenticated_user.user_id, &payload.from_id, payload.accept)
        .await
        .map_err(|e| {
            error!(
                "Failed to answer friend request from {}: {}",
                payload.from_id, e
            );
            ApiError::from(e)
        })?;

    let by = UserProfile::from(&user);
    let event = if payload.accept {
        ServerEvent::FriendRequestAccepted { by }
    } else {
        ServerEvent::FriendRequestRejected { by }
    };
    state.hub.send_to_user(&payload.from_id, &event);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_friends(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    state
        .friend_service
        .list_friends(&authenticated_user.user_id)
        .await
        .map(Json)
        .map_err(ApiError::from)
}
