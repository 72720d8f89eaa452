use tracing::info;

use crate::realtime::hub::{game_id_of, ConnectionId};
use crate::state::AppState;

/// Drops the connection from every room and from the participant set of each
/// game it joined, unless the same user is still there on another socket.
pub fn handle(state: &AppState, connection: ConnectionId) {
    let Some(departed) = state.hub.unregister(connection) else {
        return;
    };
    for room in &departed.rooms {
        let Some(game_id) = game_id_of(room) else {
            continue;
        };
        if !state.hub.user_in_room(&departed.user_id, room) {
            state.game_sessions.leave(game_id, &departed.user_id);
        }
    }
    info!("{} closed for user {}", connection, departed.user_id);
}
