pub mod challenge_repository_errors;
pub mod game_repository_errors;
pub mod user_repository_errors;
