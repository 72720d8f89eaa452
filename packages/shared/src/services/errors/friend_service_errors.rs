use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[derive(Debug, Clone, PartialEq)]
pub enum FriendServiceError {
    UserNotFound,
    CannotBefriendSelf,
    AlreadyFriends,
    RequestAlreadySent,
    /// The target has already sent a pending request to the sender.
    IncomingRequestPending,
    RequestNotFound,
    /// The records kept changing underneath every attempted write.
    Conflict,
    RepositoryError(String),
}

impl std::fmt::Display for FriendServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendServiceError::UserNotFound => write!(f, "User not found"),
            FriendServiceError::CannotBefriendSelf => {
                write!(f, "You cannot send a friend request to yourself")
            }
            FriendServiceError::AlreadyFriends => write!(f, "Users are already friends"),
            FriendServiceError::RequestAlreadySent => write!(f, "Friend request already sent"),
            FriendServiceError::IncomingRequestPending => {
                write!(f, "This user has already sent you a friend request")
            }
            FriendServiceError::RequestNotFound => write!(f, "Friend request not found"),
            FriendServiceError::Conflict => {
                write!(f, "Friend lists changed concurrently, please retry")
            }
            FriendServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for FriendServiceError {}

impl From<UserRepositoryError> for FriendServiceError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::NotFound => FriendServiceError::UserNotFound,
            UserRepositoryError::VersionConflict => FriendServiceError::Conflict,
            other => FriendServiceError::RepositoryError(other.to_string()),
        }
    }
}
