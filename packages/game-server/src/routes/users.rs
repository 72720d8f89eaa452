use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use shared::models::auth::IssuedToken;
use shared::models::user::UserProfile;
use shared::services::auth_service::AuthServiceTrait;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/me", get(get_me))
        .route("/users/search", get(search_users))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserProfile,
    #[serde(flatten)]
    pub token: IssuedToken,
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = state
        .user_service
        .create_user(&payload.username)
        .await
        .map_err(|e| {
            error!("Failed to create user {:?}: {}", payload.username, e);
            ApiError::from(e)
        })?;
    let token = state.auth_service.generate_token(&user.id)?;
    info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserProfile::from(&user),
            token,
        }),
    ))
}

async fn get_me(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .user_service
        .get_user_by_id(&authenticated_user.user_id)
        .await
        .map(|user| Json(UserProfile::from(&user)))
        .map_err(|e| {
            error!(
                "Failed to retrieve user {}: {}",
                authenticated_user.user_id, e
            );
            ApiError::from(e)
        })
}

async fn search_users(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let found = state
        .user_service
        .search_users(&authenticated_user.user_id, &params.q)
        .await?;
    Ok(Json(found))
}
