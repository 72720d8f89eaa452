#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use game_server::app;
use game_server::config::Config;
use game_server::realtime::events::ServerEvent;
use game_server::realtime::hub::{user_room, ConnectionId};
use game_server::realtime::notifier::forward_queue_events;
use game_server::state::{AppState, Repositories};
use shared::models::game::{Game, TimeControl, TimeControlKind};
use shared::models::user::User;
use shared::services::auth_service::AuthServiceTrait;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestContext {
    pub state: AppState,
    pub repositories: Repositories,
}

pub fn test_context() -> TestContext {
    let repositories = Repositories::in_memory();
    let (queue_events, queue_receiver) = unbounded_channel();
    let state = AppState::new(
        &Config::in_memory(JWT_SECRET),
        repositories.clone(),
        queue_events,
    );
    tokio::spawn(forward_queue_events(state.hub.clone(), queue_receiver));
    TestContext {
        state,
        repositories,
    }
}

impl TestContext {
    pub async fn player(&self, username: &str) -> User {
        self.state.user_service.create_user(username).await.unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.auth_service.generate_token(&user.id).unwrap().token
    }

    pub async fn active_game(&self, white: &User, black: &User) -> Game {
        let game = Game::new_active(
            &white.id,
            &black.id,
            TimeControl::new(TimeControlKind::TenMinutes),
        );
        self.repositories.games.create_game(&game).await.unwrap();
        game
    }

    pub async fn stored_game(&self, game_id: &str) -> Game {
        self.repositories
            .games
            .get_game(game_id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn rating_of(&self, user: &User) -> i32 {
        self.state
            .user_service
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .rating
    }

    /// Registers an in-process connection, as the socket task would.
    pub fn connect(&self, user: &User) -> FakeConnection {
        let (sender, receiver) = unbounded_channel();
        let id = self.state.hub.register(&user.id, sender);
        self.state.hub.join(id, &user_room(&user.id));
        FakeConnection {
            id,
            user_id: user.id.clone(),
            receiver,
        }
    }

    /// Serves the full router on an ephemeral port.
    pub async fn serve(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(self.state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}

pub struct FakeConnection {
    pub id: ConnectionId,
    pub user_id: String,
    receiver: UnboundedReceiver<ServerEvent>,
}

impl FakeConnection {
    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}
