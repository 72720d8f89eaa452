use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::error;

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::game::Game;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games/history", get(game_history))
        .route("/games/{game_id}", get(get_game))
}

async fn game_history(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<Vec<Game>>, ApiError> {
    state
        .game_sessions
        .history(&authenticated_user.user_id)
        .await
        .map(Json)
        .map_err(|e| {
            error!(
                "Failed to load game history for {}: {}",
                authenticated_user.user_id, e
            );
            ApiError::from(e)
        })
}

async fn get_game(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Path(game_id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    let game = state
        .game_sessions
        .game_record(&game_id, &authenticated_user.user_id)
        .await?;
    Ok(Json(game))
}
