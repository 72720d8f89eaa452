pub mod auth_service;
pub mod challenge_service;
pub mod chess_service;
pub mod errors;
pub mod friend_service;
pub mod game_session_service;
pub mod matchmaking_service;
pub mod rating_service;
pub mod session_registry;
pub mod user_service;
