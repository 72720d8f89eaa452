#[derive(Debug, Clone, PartialEq)]
pub enum GameRepositoryError {
    NotFound,
    AlreadyExists,
    /// The stored record no longer carries the version the writer read.
    VersionConflict,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRepositoryError::NotFound => write!(f, "Game not found"),
            GameRepositoryError::AlreadyExists => write!(f, "Game already exists"),
            GameRepositoryError::VersionConflict => {
                write!(f, "Game was modified by another writer")
            }
            GameRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for GameRepositoryError {}
