use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::actions::announce_game_over;
use crate::realtime::events::ServerEvent;
use crate::realtime::hub::game_room;
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    user_id: &str,
    game_id: &str,
    white_seconds: u64,
    black_seconds: u64,
) -> Result<(), GameSessionServiceError> {
    let outcome = state
        .game_sessions
        .update_clock(game_id, user_id, white_seconds, black_seconds)
        .await?;

    state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::TimeSync {
            game_id: game_id.to_string(),
            time_remaining_white: outcome.time_remaining_white,
            time_remaining_black: outcome.time_remaining_black,
        },
    );
    if let Some(game_over) = outcome.game_over {
        announce_game_over(state, game_over);
    }
    Ok(())
}
