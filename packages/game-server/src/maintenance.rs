use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use shared::services::session_registry::{SessionRegistry, SweepPolicy};

use crate::state::AppState;

/// Periodically evicts live sessions nobody needs any more.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    policy: SweepPolicy,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.sweep(policy);
            debug!("Sweep evicted {} session(s), {} live", evicted, registry.len());
        }
    })
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Empties the in-memory coordinators once the listener has stopped.
pub async fn drain(state: &AppState) {
    let tickets = state.matchmaking_service.drain().await;
    let sessions = state.game_sessions.registry().drain();
    info!(
        "Drained {} queued ticket(s) and {} live session(s)",
        tickets, sessions
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::game::{Game, TimeControl, TimeControlKind};
    use shared::repositories::game_repository::{GameRepository, InMemoryGameRepository};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_sessions() {
        let games = Arc::new(InMemoryGameRepository::new());
        let game = Game::new_active("w", "b", TimeControl::new(TimeControlKind::TenMinutes));
        games.create_game(&game).await.unwrap();
        let registry = Arc::new(SessionRegistry::new(games));
        registry.get_or_create(&game.game_id).await.unwrap();
        let policy = SweepPolicy {
            idle_after: Duration::from_secs(60),
            max_sessions: 100,
        };

        let sweeper = spawn_sweeper(registry.clone(), policy, Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(registry.len(), 0);
        sweeper.abort();
    }
}
