use tracing::{debug, warn};

use shared::services::errors::game_session_service_errors::GameSessionServiceError;
use shared::services::game_session_service::GameOver;

use crate::realtime::events::{ClientEvent, ServerEvent};
use crate::realtime::hub::{game_room, ConnectionId};
use crate::state::AppState;

pub mod disconnect;
pub mod draw;
pub mod join_game;
pub mod join_user;
pub mod make_move;
pub mod request_sync;
pub mod resign;
pub mod time_update;

/// Parses one inbound text frame and runs it. Malformed frames are answered
/// with an error event on the same connection.
pub async fn handle_text(state: &AppState, connection: ConnectionId, user_id: &str, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => dispatch(state, connection, user_id, event).await,
        Err(e) => {
            debug!("Unparseable event from {}: {}", connection, e);
            state
                .hub
                .send_to(connection, ServerEvent::error(format!("Invalid event: {}", e)));
        }
    }
}

/// Runs `event` on behalf of the authenticated `user_id`. Failures are
/// reported to the originating connection only.
pub async fn dispatch(state: &AppState, connection: ConnectionId, user_id: &str, event: ClientEvent) {
    if let Err(e) = run(state, connection, user_id, event).await {
        warn!("Event from {} ({}) rejected: {}", user_id, connection, e);
        state.hub.send_to(connection, ServerEvent::error(e.to_string()));
    }
}

async fn run(
    state: &AppState,
    connection: ConnectionId,
    user_id: &str,
    event: ClientEvent,
) -> Result<(), GameSessionServiceError> {
    if event.claimed_user().is_some_and(|claimed| claimed != user_id) {
        return Err(GameSessionServiceError::Unauthorized);
    }

    match event {
        ClientEvent::JoinUser { .. } => {
            join_user::handle(state, connection, user_id);
            Ok(())
        }
        ClientEvent::JoinGame { game_id, .. } => {
            join_game::handle(state, connection, user_id, &game_id).await
        }
        ClientEvent::MakeMove { game_id, mv, .. } => {
            make_move::handle(state, user_id, &game_id, &mv).await
        }
        ClientEvent::Resign { game_id, .. } => resign::handle(state, user_id, &game_id).await,
        ClientEvent::OfferDraw { game_id, .. } => draw::offer(state, user_id, &game_id).await,
        ClientEvent::AcceptDraw { game_id } => draw::accept(state, user_id, &game_id).await,
        ClientEvent::DeclineDraw { game_id } => draw::decline(state, user_id, &game_id).await,
        ClientEvent::TimeUpdate {
            game_id,
            white_seconds,
            black_seconds,
        } => time_update::handle(state, user_id, &game_id, white_seconds, black_seconds).await,
        ClientEvent::RequestSync { game_id } => {
            request_sync::handle(state, connection, user_id, &game_id).await
        }
    }
}

fn announce_game_over(state: &AppState, game_over: GameOver) {
    let room = game_room(&game_over.game.game_id);
    state.hub.broadcast(&room, &ServerEvent::GameOver(game_over));
}
