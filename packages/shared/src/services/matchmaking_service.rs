use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc::UnboundedSender, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{
    models::{
        game::{Game, TimeControl},
        queue::{EnqueueOutcome, QueueEvent, QueueTicket},
    },
    repositories::{game_repository::GameRepository, user_repository::UserRepository},
    services::errors::matchmaking_service_errors::MatchmakingServiceError,
};

pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RATING_BAND: i32 = 200;

struct QueuedTicket {
    ticket: QueueTicket,
    eviction: AbortHandle,
}

type Queue = Arc<Mutex<Vec<QueuedTicket>>>;

/// In-memory matchmaking queue. Every mutation runs under one lock, so a
/// ticket can be matched, cancelled or expired only once.
pub struct MatchmakingService {
    games: Arc<dyn GameRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    queue: Queue,
    timeout: Duration,
    rating_band: i32,
    events: Option<UnboundedSender<QueueEvent>>,
}

impl MatchmakingService {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        MatchmakingService {
            games,
            users,
            queue: Arc::new(Mutex::new(Vec::new())),
            timeout: DEFAULT_QUEUE_TIMEOUT,
            rating_band: DEFAULT_RATING_BAND,
            events: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rating_band(mut self, rating_band: i32) -> Self {
        self.rating_band = rating_band;
        self
    }

    /// Queue events (matches and expiries) are sent to `events`.
    pub fn with_events(mut self, events: UnboundedSender<QueueEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn enqueue(
        &self,
        user_id: &str,
        time_control: TimeControl,
    ) -> Result<EnqueueOutcome, MatchmakingServiceError> {
        if user_id.is_empty() {
            return Err(MatchmakingServiceError::ValidationError(
                "User ID cannot be empty".to_string(),
            ));
        }
        time_control
            .validate()
            .map_err(MatchmakingServiceError::ValidationError)?;

        let user = self.users.get_user_by_id(user_id).await?;
        let ticket = QueueTicket::new(user_id, user.rating, time_control, self.rating_band);

        let mut queue = self.queue.lock().await;
        if queue.iter().any(|q| q.ticket.user_id == user_id) {
            return Err(MatchmakingServiceError::AlreadyQueued);
        }

        let Some(index) = queue.iter().position(|q| q.ticket.pairs_with(&ticket)) else {
            let eviction = self.schedule_eviction(&ticket);
            queue.push(QueuedTicket { ticket, eviction });
            info!("User {} queued ({} waiting)", user_id, queue.len());
            return Ok(EnqueueOutcome::Queued);
        };

        let opponent_id = queue[index].ticket.user_id.clone();
        let (game, color) = Game::with_random_colors(user_id, &opponent_id, time_control);
        // The opponent keeps its place if the game cannot be stored.
        self.games.create_game(&game).await?;

        let opponent = queue.remove(index);
        opponent.eviction.abort();
        drop(queue);

        info!(
            "Matched {} with {} in game {}",
            user_id, opponent_id, game.game_id
        );
        self.emit(QueueEvent::Matched {
            user_id: user_id.to_string(),
            opponent_id: opponent_id.clone(),
            game_id: game.game_id.clone(),
            color,
        });
        self.emit(QueueEvent::Matched {
            user_id: opponent_id.clone(),
            opponent_id: user_id.to_string(),
            game_id: game.game_id.clone(),
            color: color.opponent(),
        });

        Ok(EnqueueOutcome::Matched {
            opponent_id,
            game_id: game.game_id,
            color,
        })
    }

    /// Removes the user's ticket. Returns whether one was queued.
    pub async fn cancel(&self, user_id: &str) -> bool {
        let mut queue = self.queue.lock().await;
        match queue.iter().position(|q| q.ticket.user_id == user_id) {
            Some(index) => {
                let removed = queue.remove(index);
                removed.eviction.abort();
                debug!("User {} left the queue", user_id);
                true
            }
            None => false,
        }
    }

    pub async fn is_queued(&self, user_id: &str) -> bool {
        self.queue
            .lock()
            .await
            .iter()
            .any(|q| q.ticket.user_id == user_id)
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Empties the queue and cancels every scheduled eviction.
    pub async fn drain(&self) -> usize {
        let mut queue = self.queue.lock().await;
        let drained = queue.len();
        for queued in queue.drain(..) {
            queued.eviction.abort();
        }
        info!("Drained {} queued tickets", drained);
        drained
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                warn!("Queue event receiver is gone");
            }
        }
    }

    fn schedule_eviction(&self, ticket: &QueueTicket) -> AbortHandle {
        let queue = self.queue.clone();
        let events = self.events.clone();
        let timeout = self.timeout;
        let user_id = ticket.user_id.clone();
        let joined_at = ticket.joined_at;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut queue = queue.lock().await;
            let Some(index) = queue
                .iter()
                .position(|q| q.ticket.user_id == user_id && q.ticket.joined_at == joined_at)
            else {
                return;
            };
            queue.remove(index);
            drop(queue);

            info!("Queue ticket for {} expired", user_id);
            if let Some(events) = events {
                let _ = events.send(QueueEvent::Expired { user_id });
            }
        });
        handle.abort_handle()
    }
}
