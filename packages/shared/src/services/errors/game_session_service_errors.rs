use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::services::errors::chess_service_errors::ChessServiceError;

#[derive(Debug, Clone, PartialEq)]
pub enum GameSessionServiceError {
    /// The requester is not one of the two players of the game.
    Unauthorized,
    GameNotFound,
    GameNotActive,
    NotYourTurn,
    IllegalMove(String),
    NoRatingData(String),
    NoDrawOffer,
    RepositoryError(GameRepositoryError),
    /// A player record could not be read for a reason other than absence.
    UserRepositoryError(UserRepositoryError),
    ChessError(ChessServiceError),
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::Unauthorized => {
                write!(f, "You are not a player in this game")
            }
            GameSessionServiceError::GameNotFound => write!(f, "Game not found"),
            GameSessionServiceError::GameNotActive => write!(f, "Game is not active"),
            GameSessionServiceError::NotYourTurn => write!(f, "It is not your turn"),
            GameSessionServiceError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            GameSessionServiceError::NoRatingData(user_id) => {
                write!(f, "No rating data for user {}", user_id)
            }
            GameSessionServiceError::NoDrawOffer => write!(f, "There is no draw offer to answer"),
            GameSessionServiceError::RepositoryError(err) => {
                write!(f, "Repository error: {}", err)
            }
            GameSessionServiceError::UserRepositoryError(err) => {
                write!(f, "User repository error: {}", err)
            }
            GameSessionServiceError::ChessError(err) => write!(f, "Chess error: {}", err),
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<GameRepositoryError> for GameSessionServiceError {
    fn from(err: GameRepositoryError) -> Self {
        match err {
            GameRepositoryError::NotFound => GameSessionServiceError::GameNotFound,
            other => GameSessionServiceError::RepositoryError(other),
        }
    }
}

impl From<ChessServiceError> for GameSessionServiceError {
    fn from(err: ChessServiceError) -> Self {
        match err {
            ChessServiceError::IllegalMove(msg) | ChessServiceError::ValidationError(msg) => {
                GameSessionServiceError::IllegalMove(msg)
            }
            ChessServiceError::GameOver(_) => GameSessionServiceError::GameNotActive,
            other => GameSessionServiceError::ChessError(other),
        }
    }
}
