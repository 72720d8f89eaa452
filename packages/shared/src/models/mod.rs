pub mod auth;
pub mod challenge;
pub mod game;
pub mod move_request;
pub mod queue;
pub mod user;
