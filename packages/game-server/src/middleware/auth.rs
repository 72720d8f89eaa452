use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::{error::ApiError, state::AppState};
use shared::services::auth_service::AuthServiceTrait;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// The token of an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let user_id = state
            .auth_service
            .extract_user_id_from_token(token)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                ApiError::from(e)
            })?;

        Ok(AuthenticatedUser { user_id })
    }
}
