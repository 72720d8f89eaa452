use tracing::info;

use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::realtime::events::ServerEvent;
use crate::realtime::hub::{game_room, ConnectionId};
use crate::state::AppState;

/// The connection enters the room before the snapshot is taken, so a move
/// committed in between is either in the snapshot or broadcast to it.
pub async fn handle(
    state: &AppState,
    connection: ConnectionId,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let room = game_room(game_id);
    let rejoining = state.hub.is_member(connection, &room);
    state.hub.join(connection, &room);

    let snapshot = match state.game_sessions.join(game_id, user_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            if !rejoining {
                state.hub.leave(connection, &room);
            }
            return Err(e);
        }
    };
    info!("User {} joined game {} on {}", user_id, game_id, connection);
    state.hub.send_to(connection, ServerEvent::GameState(snapshot));
    Ok(())
}
