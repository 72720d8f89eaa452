use tracing::debug;

use crate::realtime::hub::{user_room, ConnectionId};
use crate::state::AppState;

/// Subscribes the connection to the user's notification room. Connections
/// are already placed there on upgrade, so repeating it is harmless.
pub fn handle(state: &AppState, connection: ConnectionId, user_id: &str) {
    state.hub.join(connection, &user_room(user_id));
    debug!("{} joined notifications for {}", connection, user_id);
}
