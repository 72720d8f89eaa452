use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::realtime::events::ServerEvent;
use crate::realtime::hub::ConnectionId;
use crate::state::AppState;

/// Sends the full current state to the requesting connection only.
pub async fn handle(
    state: &AppState,
    connection: ConnectionId,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let snapshot = state.game_sessions.snapshot(game_id, user_id).await?;
    state.hub.send_to(connection, ServerEvent::GameState(snapshot));
    Ok(())
}
