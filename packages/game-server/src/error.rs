use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use shared::services::errors::{
    auth_service_errors::AuthServiceError, challenge_service_errors::ChallengeServiceError,
    friend_service_errors::FriendServiceError,
    game_session_service_errors::GameSessionServiceError,
    matchmaking_service_errors::MatchmakingServiceError, user_service_errors::UserServiceError,
};

#[derive(Debug)]
pub enum ApiError {
    UserService(UserServiceError),
    AuthService(AuthServiceError),
    MatchmakingService(MatchmakingServiceError),
    ChallengeService(ChallengeServiceError),
    FriendService(FriendServiceError),
    GameSessionService(GameSessionServiceError),
    Unauthorized,
    NotFound(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::UserService(e) => write!(f, "{}", e),
            ApiError::AuthService(e) => write!(f, "{}", e),
            ApiError::MatchmakingService(e) => write!(f, "{}", e),
            ApiError::ChallengeService(e) => write!(f, "{}", e),
            ApiError::FriendService(e) => write!(f, "{}", e),
            ApiError::GameSessionService(e) => write!(f, "{}", e),
            ApiError::Unauthorized => write!(f, "Missing or malformed credentials"),
            ApiError::NotFound(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<UserServiceError> for ApiError {
    fn from(error: UserServiceError) -> Self {
        ApiError::UserService(error)
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(error: AuthServiceError) -> Self {
        ApiError::AuthService(error)
    }
}

impl From<MatchmakingServiceError> for ApiError {
    fn from(error: MatchmakingServiceError) -> Self {
        ApiError::MatchmakingService(error)
    }
}

impl From<ChallengeServiceError> for ApiError {
    fn from(error: ChallengeServiceError) -> Self {
        ApiError::ChallengeService(error)
    }
}

impl From<FriendServiceError> for ApiError {
    fn from(error: FriendServiceError) -> Self {
        ApiError::FriendService(error)
    }
}

impl From<GameSessionServiceError> for ApiError {
    fn from(error: GameSessionServiceError) -> Self {
        ApiError::GameSessionService(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UserService(UserServiceError::UserAlreadyExists) => StatusCode::CONFLICT,
            ApiError::UserService(UserServiceError::UserNotFound) => StatusCode::NOT_FOUND,
            ApiError::UserService(UserServiceError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            ApiError::UserService(UserServiceError::RepositoryError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::AuthService(AuthServiceError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            ApiError::AuthService(AuthServiceError::JwtError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::AuthService(
                AuthServiceError::InvalidToken | AuthServiceError::ExpiredToken,
            ) => StatusCode::UNAUTHORIZED,

            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,

            ApiError::MatchmakingService(MatchmakingServiceError::AlreadyQueued) => {
                StatusCode::CONFLICT
            }
            ApiError::MatchmakingService(MatchmakingServiceError::UserNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::MatchmakingService(MatchmakingServiceError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MatchmakingService(MatchmakingServiceError::RepositoryError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::ChallengeService(
                ChallengeServiceError::ChallengeNotFound | ChallengeServiceError::UserNotFound,
            ) => StatusCode::NOT_FOUND,
            ApiError::ChallengeService(ChallengeServiceError::NotFriends) => StatusCode::FORBIDDEN,
            ApiError::ChallengeService(ChallengeServiceError::Unauthorized) => {
                StatusCode::FORBIDDEN
            }
            ApiError::ChallengeService(
                ChallengeServiceError::AlreadyPending | ChallengeServiceError::NotPending,
            ) => StatusCode::CONFLICT,
            ApiError::ChallengeService(ChallengeServiceError::ChallengeExpired) => StatusCode::GONE,
            ApiError::ChallengeService(ChallengeServiceError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ChallengeService(ChallengeServiceError::RepositoryError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::FriendService(
                FriendServiceError::UserNotFound | FriendServiceError::RequestNotFound,
            ) => StatusCode::NOT_FOUND,
            ApiError::FriendService(FriendServiceError::CannotBefriendSelf) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::FriendService(
                FriendServiceError::AlreadyFriends
                | FriendServiceError::RequestAlreadySent
                | FriendServiceError::IncomingRequestPending
                | FriendServiceError::Conflict,
            ) => StatusCode::CONFLICT,
            ApiError::FriendService(FriendServiceError::RepositoryError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::GameSessionService(GameSessionServiceError::Unauthorized) => {
                StatusCode::FORBIDDEN
            }
            ApiError::GameSessionService(GameSessionServiceError::GameNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::GameSessionService(
                GameSessionServiceError::GameNotActive
                | GameSessionServiceError::NotYourTurn
                | GameSessionServiceError::NoDrawOffer,
            ) => StatusCode::CONFLICT,
            ApiError::GameSessionService(GameSessionServiceError::IllegalMove(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GameSessionService(
                GameSessionServiceError::RepositoryError(_)
                | GameSessionServiceError::UserRepositoryError(_)
                | GameSessionServiceError::ChessError(_)
                | GameSessionServiceError::NoRatingData(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
