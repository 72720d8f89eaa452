pub mod challenge_repository;
pub mod errors;
pub mod game_repository;
pub mod user_repository;

#[cfg(test)]
pub(crate) mod yielding;
