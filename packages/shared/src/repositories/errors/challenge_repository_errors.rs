#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeRepositoryError {
    NotFound,
    /// Another pending challenge already holds the pair of players.
    PairTaken,
    /// The stored challenge is no longer pending.
    NotPending,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for ChallengeRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeRepositoryError::NotFound => write!(f, "Challenge not found"),
            ChallengeRepositoryError::PairTaken => {
                write!(f, "A pending challenge already exists for this pair")
            }
            ChallengeRepositoryError::NotPending => write!(f, "Challenge is no longer pending"),
            ChallengeRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ChallengeRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for ChallengeRepositoryError {}
