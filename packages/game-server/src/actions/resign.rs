use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::actions::announce_game_over;
use crate::realtime::events::ServerEvent;
use crate::realtime::hub::game_room;
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let outcome = state.game_sessions.resign(game_id, user_id).await?;

    state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::PlayerResigned {
            game_id: game_id.to_string(),
            user_id: user_id.to_string(),
            color: outcome.resigned,
        },
    );
    announce_game_over(state, outcome.game_over);
    Ok(())
}
