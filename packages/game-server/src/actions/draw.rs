use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::actions::announce_game_over;
use crate::realtime::events::ServerEvent;
use crate::realtime::hub::game_room;
use crate::state::AppState;

pub async fn offer(
    state: &AppState,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let by = state.game_sessions.offer_draw(game_id, user_id).await?;
    state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::DrawOffered {
            game_id: game_id.to_string(),
            by,
        },
    );
    Ok(())
}

pub async fn accept(
    state: &AppState,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let game_over = state.game_sessions.accept_draw(game_id, user_id).await?;
    state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::DrawAccepted {
            game_id: game_id.to_string(),
        },
    );
    announce_game_over(state, game_over);
    Ok(())
}

pub async fn decline(
    state: &AppState,
    user_id: &str,
    game_id: &str,
) -> Result<(), GameSessionServiceError> {
    let by = state.game_sessions.decline_draw(game_id, user_id).await?;
    state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::DrawDeclined {
            game_id: game_id.to_string(),
            by,
        },
    );
    Ok(())
}
