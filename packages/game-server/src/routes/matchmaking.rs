use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::game::TimeControl;
use shared::models::queue::EnqueueOutcome;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/matchmaking",
        post(join_queue).delete(leave_queue).get(queue_status),
    )
}

#[derive(Debug, Deserialize)]
pub struct JoinQueueRequest {
    pub time_control: TimeControl,
}

#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub queued: bool,
}

async fn join_queue(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<JoinQueueRequest>,
) -> Result<Json<EnqueueOutcome>, ApiError> {
    state
        .matchmaking_service
        .enqueue(&authenticated_user.user_id, payload.time_control)
        .await
        .map(Json)
        .map_err(|e| {
            error!(
                "Failed to queue user {}: {}",
                authenticated_user.user_id, e
            );
            ApiError::from(e)
        })
}

async fn leave_queue(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    if state
        .matchmaking_service
        .cancel(&authenticated_user.user_id)
        .await
    {
        debug!("User {} left the queue", authenticated_user.user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("User is not in the queue".to_string()))
    }
}

async fn queue_status(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Json<QueueStatus> {
    let queued = state
        .matchmaking_service
        .is_queued(&authenticated_user.user_id)
        .await;
    Json(QueueStatus { queued })
}
