#[derive(Debug, Clone, PartialEq)]
pub enum UserRepositoryError {
    NotFound,
    AlreadyExists,
    /// A stored record no longer carries the version the writer read.
    VersionConflict,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for UserRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRepositoryError::NotFound => write!(f, "User not found"),
            UserRepositoryError::AlreadyExists => write!(f, "User already exists"),
            UserRepositoryError::VersionConflict => {
                write!(f, "User was modified by another writer")
            }
            UserRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            UserRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for UserRepositoryError {}
