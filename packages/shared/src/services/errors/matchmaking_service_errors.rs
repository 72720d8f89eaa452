use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchmakingServiceError {
    AlreadyQueued,
    UserNotFound,
    ValidationError(String),
    RepositoryError(String),
}

impl std::fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchmakingServiceError::AlreadyQueued => write!(f, "User is already in the queue"),
            MatchmakingServiceError::UserNotFound => write!(f, "User not found"),
            MatchmakingServiceError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
            MatchmakingServiceError::RepositoryError(msg) => {
                write!(f, "Repository error: {}", msg)
            }
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}

impl From<GameRepositoryError> for MatchmakingServiceError {
    fn from(err: GameRepositoryError) -> Self {
        MatchmakingServiceError::RepositoryError(err.to_string())
    }
}

impl From<UserRepositoryError> for MatchmakingServiceError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::NotFound => MatchmakingServiceError::UserNotFound,
            other => MatchmakingServiceError::RepositoryError(other.to_string()),
        }
    }
}
