use tracing::debug;

use shared::models::move_request::MoveRequest;
use shared::services::errors::game_session_service_errors::GameSessionServiceError;

use crate::actions::announce_game_over;
use crate::realtime::events::{MoveMade, ServerEvent};
use crate::realtime::hub::game_room;
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    user_id: &str,
    game_id: &str,
    request: &MoveRequest,
) -> Result<(), GameSessionServiceError> {
    let outcome = state
        .game_sessions
        .make_move(game_id, user_id, request)
        .await?;

    let delivered = state.hub.broadcast(
        &game_room(game_id),
        &ServerEvent::MoveMade(MoveMade::from(&outcome)),
    );
    debug!("Move {} in {} reached {} connection(s)", outcome.san, game_id, delivered);

    if let Some(game_over) = outcome.game_over {
        announce_game_over(state, game_over);
    }
    Ok(())
}
