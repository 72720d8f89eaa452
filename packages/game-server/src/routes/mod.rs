pub mod challenges;
pub mod friends;
pub mod games;
pub mod health;
pub mod matchmaking;
pub mod users;
pub mod websocket;
