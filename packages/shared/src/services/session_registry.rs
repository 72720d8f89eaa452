use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OnceCell, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    models::game::{Color, Game, GameStatus},
    repositories::game_repository::GameRepository,
    services::{
        chess_service::Position, errors::game_session_service_errors::GameSessionServiceError,
    },
};

/// Mutable state of one live game. Only reachable through the session lock,
/// so moves for a game are applied one at a time.
#[derive(Debug)]
pub struct SessionState {
    pub game: Game,
    pub position: Position,
    /// Color of the player with an unanswered draw offer.
    pub draw_offer: Option<Color>,
    /// Set when a commit failed; the session no longer mirrors the stored
    /// record and must be rebuilt.
    pub invalidated: bool,
}

#[derive(Debug)]
pub struct LiveSession {
    game_id: String,
    state: Arc<AsyncMutex<SessionState>>,
    participants: Mutex<HashSet<String>>,
    last_active: Mutex<Instant>,
    completed: AtomicBool,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LiveSession {
    fn new(game: Game, position: Position) -> Self {
        let completed = game.is_completed();
        LiveSession {
            game_id: game.game_id.clone(),
            state: Arc::new(AsyncMutex::new(SessionState {
                game,
                position,
                draw_offer: None,
                invalidated: false,
            })),
            participants: Mutex::new(HashSet::new()),
            last_active: Mutex::new(Instant::now()),
            completed: AtomicBool::new(completed),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub async fn lock(&self) -> OwnedMutexGuard<SessionState> {
        self.state.clone().lock_owned().await
    }

    /// Returns true when the user was not already connected.
    pub fn add_participant(&self, user_id: &str) -> bool {
        self.touch();
        guard(&self.participants).insert(user_id.to_string())
    }

    pub fn remove_participant(&self, user_id: &str) -> bool {
        guard(&self.participants).remove(user_id)
    }

    pub fn has_participants(&self) -> bool {
        !guard(&self.participants).is_empty()
    }

    pub fn participants(&self) -> Vec<String> {
        guard(&self.participants).iter().cloned().collect()
    }

    pub fn touch(&self) {
        *guard(&self.last_active) = Instant::now();
    }

    pub fn last_active(&self) -> Instant {
        *guard(&self.last_active)
    }

    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

type SessionCell = Arc<OnceCell<Arc<LiveSession>>>;

/// Eviction thresholds applied by [`SessionRegistry::sweep`].
#[derive(Debug, Clone, Copy)]
pub struct SweepPolicy {
    pub idle_after: Duration,
    pub max_sessions: usize,
}

/// Process-wide map from game id to live session. Sessions are built lazily
/// from the stored record, and concurrent first joins share one build.
pub struct SessionRegistry {
    games: Arc<dyn GameRepository + Send + Sync>,
    sessions: Mutex<HashMap<String, SessionCell>>,
}

impl SessionRegistry {
    pub fn new(games: Arc<dyn GameRepository + Send + Sync>) -> Self {
        SessionRegistry {
            games,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, game_id: &str) -> Option<Arc<LiveSession>> {
        guard(&self.sessions)
            .get(game_id)
            .and_then(|cell| cell.get().cloned())
    }

    pub async fn get_or_create(
        &self,
        game_id: &str,
    ) -> Result<Arc<LiveSession>, GameSessionServiceError> {
        let cell = guard(&self.sessions)
            .entry(game_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_try_init(|| self.rebuild(game_id))
            .await
            .cloned();

        if result.is_err() {
            let mut sessions = guard(&self.sessions);
            let unbuilt = sessions
                .get(game_id)
                .map(|current| Arc::ptr_eq(current, &cell) && current.get().is_none())
                .unwrap_or(false);
            if unbuilt {
                sessions.remove(game_id);
            }
        }
        result
    }

    async fn rebuild(&self, game_id: &str) -> Result<Arc<LiveSession>, GameSessionServiceError> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)?;

        if !matches!(game.status, GameStatus::Active | GameStatus::Waiting) {
            return Err(GameSessionServiceError::GameNotActive);
        }

        let position = Position::replay(&game.move_history)?;
        if position.fen() != game.fen_board {
            warn!(
                "Replayed position for game {} differs from stored FEN {}; using replay",
                game_id, game.fen_board
            );
        }
        info!(
            "Rebuilt session for game {} from {} stored moves",
            game_id,
            game.move_history.len()
        );
        Ok(Arc::new(LiveSession::new(game, position)))
    }

    pub fn remove(&self, game_id: &str) -> Option<Arc<LiveSession>> {
        guard(&self.sessions)
            .remove(game_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Removes `session` only if it is still the registered one for its game.
    pub fn discard(&self, session: &Arc<LiveSession>) {
        let mut sessions = guard(&self.sessions);
        let registered = sessions
            .get(session.game_id())
            .and_then(|cell| cell.get())
            .map(|current| Arc::ptr_eq(current, session))
            .unwrap_or(false);
        if registered {
            sessions.remove(session.game_id());
            debug!("Discarded session for game {}", session.game_id());
        }
    }

    pub fn len(&self) -> usize {
        guard(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts participant-free sessions that are completed or idle, then the
    /// least recently active ones while the registry is over capacity.
    /// Returns the number of evicted sessions.
    pub fn sweep(&self, policy: SweepPolicy) -> usize {
        let now = Instant::now();
        let mut sessions = guard(&self.sessions);
        let before = sessions.len();

        sessions.retain(|_, cell| match cell.get() {
            Some(session) => {
                session.has_participants()
                    || (!session.is_completed()
                        && now.duration_since(session.last_active()) < policy.idle_after)
            }
            // still being built
            None => true,
        });

        if sessions.len() > policy.max_sessions {
            let mut idle: Vec<(String, Instant)> = sessions
                .iter()
                .filter_map(|(id, cell)| cell.get().map(|s| (id, s)))
                .filter(|(_, s)| !s.has_participants())
                .map(|(id, s)| (id.clone(), s.last_active()))
                .collect();
            idle.sort_by_key(|(_, last_active)| *last_active);

            let excess = sessions.len() - policy.max_sessions;
            for (id, _) in idle.into_iter().take(excess) {
                sessions.remove(&id);
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                "Evicted {} live sessions, {} remaining",
                evicted,
                sessions.len()
            );
        }
        evicted
    }

    /// Drops every live session. Used on shutdown.
    pub fn drain(&self) -> usize {
        let mut sessions = guard(&self.sessions);
        let drained = sessions.len();
        sessions.clear();
        info!("Drained {} live sessions", drained);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::{TimeControl, TimeControlKind};
    use crate::repositories::game_repository::{InMemoryGameRepository, MockGameRepository};

    fn stored_game(moves: &[&str]) -> Game {
        let mut game = Game::new_active("white", "black", TimeControl::new(TimeControlKind::TenMinutes));
        game.move_history = moves.iter().map(|m| m.to_string()).collect();
        game.fen_board = Position::replay(&game.move_history).unwrap().fen();
        game
    }

    async fn registry_with(game: &Game) -> SessionRegistry {
        let repo = InMemoryGameRepository::new();
        repo.create_game(game).await.unwrap();
        SessionRegistry::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_rebuild_replays_stored_moves() {
        let game = stored_game(&["e4", "e5", "Nf3"]);
        let registry = registry_with(&game).await;

        let session = registry.get_or_create(&game.game_id).await.unwrap();

        let state = session.lock().await;
        assert_eq!(state.game.move_history.len(), 3);
        assert_eq!(state.position.side_to_move(), Color::Black);
        assert_eq!(state.position.fen(), game.fen_board);
    }

    #[tokio::test]
    async fn test_missing_game_is_not_cached() {
        let registry = SessionRegistry::new(Arc::new(InMemoryGameRepository::new()));

        let result = registry.get_or_create("nope").await;

        assert_eq!(result.unwrap_err(), GameSessionServiceError::GameNotFound);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_completed_game_is_rejected() {
        let mut game = stored_game(&[]);
        game.status = GameStatus::Completed;
        let registry = registry_with(&game).await;

        let result = registry.get_or_create(&game.game_id).await;

        assert_eq!(result.unwrap_err(), GameSessionServiceError::GameNotActive);
    }

    #[tokio::test]
    async fn test_concurrent_creation_loads_once() {
        let game = stored_game(&["d4"]);
        let stored = game.clone();
        let mut repo = MockGameRepository::new();
        repo.expect_get_game()
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));
        let registry = Arc::new(SessionRegistry::new(Arc::new(repo)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let game_id = game.game_id.clone();
                tokio::spawn(async move { registry.get_or_create(&game_id).await.unwrap() })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_discard_ignores_replaced_session() {
        let game = stored_game(&[]);
        let registry = registry_with(&game).await;
        let old = registry.get_or_create(&game.game_id).await.unwrap();
        registry.remove(&game.game_id);
        let fresh = registry.get_or_create(&game.game_id).await.unwrap();

        registry.discard(&old);

        let current = registry.get(&game.game_id).unwrap();
        assert!(Arc::ptr_eq(&current, &fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_completed_and_idle_sessions() {
        let repo = InMemoryGameRepository::new();
        let done = stored_game(&[]);
        let idle = stored_game(&[]);
        let watched = stored_game(&[]);
        for game in [&done, &idle, &watched] {
            repo.create_game(game).await.unwrap();
        }
        let registry = SessionRegistry::new(Arc::new(repo));
        registry.get_or_create(&done.game_id).await.unwrap().mark_completed();
        registry.get_or_create(&idle.game_id).await.unwrap();
        registry
            .get_or_create(&watched.game_id)
            .await
            .unwrap()
            .add_participant("white");
        let policy = SweepPolicy {
            idle_after: Duration::from_secs(600),
            max_sessions: 100,
        };

        assert_eq!(registry.sweep(policy), 1);
        assert!(registry.get(&done.game_id).is_none());

        tokio::time::advance(Duration::from_secs(601)).await;

        assert_eq!(registry.sweep(policy), 1);
        assert!(registry.get(&idle.game_id).is_none());
        assert!(registry.get(&watched.game_id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_caps_session_count_by_recency() {
        let repo = InMemoryGameRepository::new();
        let games: Vec<Game> = (0..3).map(|_| stored_game(&[])).collect();
        for game in &games {
            repo.create_game(game).await.unwrap();
        }
        let registry = SessionRegistry::new(Arc::new(repo));
        for game in &games {
            registry.get_or_create(&game.game_id).await.unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        let evicted = registry.sweep(SweepPolicy {
            idle_after: Duration::from_secs(3600),
            max_sessions: 1,
        });

        assert_eq!(evicted, 2);
        assert!(registry.get(&games[2].game_id).is_some());
    }

    #[tokio::test]
    async fn test_drain_empties_registry() {
        let game = stored_game(&[]);
        let registry = registry_with(&game).await;
        registry.get_or_create(&game.game_id).await.unwrap();

        assert_eq!(registry.drain(), 1);
        assert!(registry.is_empty());
    }
}
