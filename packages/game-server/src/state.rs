use std::sync::Arc;

use aws_sdk_dynamodb::Client;
use tokio::sync::mpsc::UnboundedSender;

use shared::models::queue::QueueEvent;
use shared::repositories::challenge_repository::{
    ChallengeRepository, DynamoDbChallengeRepository, InMemoryChallengeRepository,
};
use shared::repositories::game_repository::{
    DynamoDbGameRepository, GameRepository, InMemoryGameRepository,
};
use shared::repositories::user_repository::{
    DynamoDbUserRepository, InMemoryUserRepository, UserRepository,
};
use shared::services::auth_service::AuthService;
use shared::services::challenge_service::ChallengeService;
use shared::services::friend_service::FriendService;
use shared::services::game_session_service::GameSessionService;
use shared::services::matchmaking_service::MatchmakingService;
use shared::services::session_registry::SessionRegistry;
use shared::services::user_service::UserService;

use crate::config::{Config, Tables};
use crate::realtime::hub::Hub;

/// The storage handles every service is built from.
#[derive(Clone)]
pub struct Repositories {
    pub games: Arc<dyn GameRepository + Send + Sync>,
    pub users: Arc<dyn UserRepository + Send + Sync>,
    pub challenges: Arc<dyn ChallengeRepository + Send + Sync>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Repositories {
            games: Arc::new(InMemoryGameRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            challenges: Arc::new(InMemoryChallengeRepository::new()),
        }
    }

    pub fn dynamodb(client: Client, tables: &Tables) -> Self {
        Repositories {
            games: Arc::new(DynamoDbGameRepository::new(
                client.clone(),
                tables.games.clone(),
            )),
            users: Arc::new(DynamoDbUserRepository::new(
                client.clone(),
                tables.users.clone(),
            )),
            challenges: Arc::new(DynamoDbChallengeRepository::new(
                client,
                tables.challenges.clone(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub friend_service: Arc<FriendService>,
    pub challenge_service: Arc<ChallengeService>,
    pub matchmaking_service: Arc<MatchmakingService>,
    pub game_sessions: Arc<GameSessionService>,
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Wires every service onto `repositories`. Matchmaking notifications are
    /// sent to `queue_events`.
    pub fn new(
        config: &Config,
        repositories: Repositories,
        queue_events: UnboundedSender<QueueEvent>,
    ) -> Self {
        let Repositories {
            games,
            users,
            challenges,
        } = repositories;

        let registry = Arc::new(SessionRegistry::new(games.clone()));
        let matchmaking_service = MatchmakingService::new(games.clone(), users.clone())
            .with_timeout(config.matchmaking_timeout)
            .with_rating_band(config.rating_band)
            .with_events(queue_events);
        let challenge_service = ChallengeService::new(challenges, users.clone(), games.clone())
            .with_ttl(config.challenge_ttl);

        AppState {
            auth_service: Arc::new(AuthService::with_jwt_secret(config.jwt_secret.clone())),
            user_service: Arc::new(UserService::new(users.clone())),
            friend_service: Arc::new(FriendService::new(users.clone())),
            challenge_service: Arc::new(challenge_service),
            matchmaking_service: Arc::new(matchmaking_service),
            game_sessions: Arc::new(GameSessionService::new(registry, games, users)),
            hub: Arc::new(Hub::new()),
        }
    }
}
