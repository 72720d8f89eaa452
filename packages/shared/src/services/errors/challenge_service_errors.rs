use crate::repositories::errors::challenge_repository_errors::ChallengeRepositoryError;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeServiceError {
    ChallengeNotFound,
    UserNotFound,
    NotFriends,
    AlreadyPending,
    ChallengeExpired,
    /// The challenge was already accepted, rejected or expired.
    NotPending,
    Unauthorized,
    ValidationError(String),
    RepositoryError(String),
}

impl std::fmt::Display for ChallengeServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeServiceError::ChallengeNotFound => write!(f, "Challenge not found"),
            ChallengeServiceError::UserNotFound => write!(f, "User not found"),
            ChallengeServiceError::NotFriends => {
                write!(f, "You can only challenge your friends")
            }
            ChallengeServiceError::AlreadyPending => {
                write!(f, "A challenge between these players is already pending")
            }
            ChallengeServiceError::ChallengeExpired => write!(f, "Challenge has expired"),
            ChallengeServiceError::NotPending => write!(f, "Challenge is no longer pending"),
            ChallengeServiceError::Unauthorized => {
                write!(f, "Only the challenged player can respond")
            }
            ChallengeServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ChallengeServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for ChallengeServiceError {}

impl From<ChallengeRepositoryError> for ChallengeServiceError {
    fn from(err: ChallengeRepositoryError) -> Self {
        match err {
            ChallengeRepositoryError::NotFound => ChallengeServiceError::ChallengeNotFound,
            ChallengeRepositoryError::PairTaken => ChallengeServiceError::AlreadyPending,
            ChallengeRepositoryError::NotPending => ChallengeServiceError::NotPending,
            other => ChallengeServiceError::RepositoryError(other.to_string()),
        }
    }
}

impl From<UserRepositoryError> for ChallengeServiceError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::NotFound => ChallengeServiceError::UserNotFound,
            other => ChallengeServiceError::RepositoryError(other.to_string()),
        }
    }
}

impl From<GameRepositoryError> for ChallengeServiceError {
    fn from(err: GameRepositoryError) -> Self {
        ChallengeServiceError::RepositoryError(err.to_string())
    }
}
