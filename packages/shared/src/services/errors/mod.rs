pub mod auth_service_errors;
pub mod challenge_service_errors;
pub mod chess_service_errors;
pub mod friend_service_errors;
pub mod game_session_service_errors;
pub mod matchmaking_service_errors;
pub mod user_service_errors;
