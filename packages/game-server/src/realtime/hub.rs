use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::realtime::events::ServerEvent;

pub fn game_room(game_id: &str) -> String {
    format!("game:{}", game_id)
}

pub fn user_room(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Extracts the game id from a `game:` room name.
pub fn game_id_of(room: &str) -> Option<&str> {
    room.strip_prefix("game:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    user_id: String,
    sender: UnboundedSender<ServerEvent>,
    rooms: HashSet<String>,
}

/// What is left of a connection once it has been unregistered.
#[derive(Debug, Clone, PartialEq)]
pub struct Departed {
    pub user_id: String,
    pub rooms: Vec<String>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Tracks live sockets and the rooms they belong to. Each connection owns an
/// outbound channel drained by its socket writer task.
#[derive(Default)]
pub struct Hub {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, user_id: &str, sender: UnboundedSender<ServerEvent>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry().connections.insert(
            id,
            Connection {
                user_id: user_id.to_string(),
                sender,
                rooms: HashSet::new(),
            },
        );
        debug!("Registered {} for user {}", id, user_id);
        id
    }

    pub fn unregister(&self, id: ConnectionId) -> Option<Departed> {
        let mut registry = self.registry();
        let connection = registry.connections.remove(&id)?;
        for room in &connection.rooms {
            if let Some(members) = registry.rooms.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    registry.rooms.remove(room);
                }
            }
        }
        debug!("Unregistered {} for user {}", id, connection.user_id);
        Some(Departed {
            user_id: connection.user_id,
            rooms: connection.rooms.into_iter().collect(),
        })
    }

    /// Returns false when the connection is unknown.
    pub fn join(&self, id: ConnectionId, room: &str) -> bool {
        let mut registry = self.registry();
        match registry.connections.get_mut(&id) {
            Some(connection) => {
                connection.rooms.insert(room.to_string());
            }
            None => return false,
        }
        registry
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(id);
        true
    }

    pub fn is_member(&self, id: ConnectionId, room: &str) -> bool {
        self.registry()
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(&id))
    }

    pub fn leave(&self, id: ConnectionId, room: &str) {
        let mut registry = self.registry();
        if let Some(connection) = registry.connections.get_mut(&id) {
            connection.rooms.remove(room);
        }
        if let Some(members) = registry.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                registry.rooms.remove(room);
            }
        }
    }

    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        let registry = self.registry();
        match registry.connections.get(&id) {
            Some(connection) => connection.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Delivers `event` to every connection in `room`, returning how many
    /// accepted it.
    pub fn broadcast(&self, room: &str, event: &ServerEvent) -> usize {
        let registry = self.registry();
        let Some(members) = registry.rooms.get(room) else {
            debug!("No listeners in {}", room);
            return 0;
        };
        let mut delivered = 0;
        for id in members {
            match registry.connections.get(id) {
                Some(connection) if connection.sender.send(event.clone()).is_ok() => {
                    delivered += 1;
                }
                _ => warn!("Dropped event for closed connection {}", id),
            }
        }
        delivered
    }

    pub fn send_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        self.broadcast(&user_room(user_id), event)
    }

    /// Whether any connection of `user_id` is still in `room`.
    pub fn user_in_room(&self, user_id: &str, room: &str) -> bool {
        let registry = self.registry();
        registry.rooms.get(room).is_some_and(|members| {
            members.iter().any(|id| {
                registry
                    .connections
                    .get(id)
                    .is_some_and(|c| c.user_id == user_id)
            })
        })
    }

    pub fn connection_count(&self) -> usize {
        self.registry().connections.len()
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.registry().rooms.get(room).map_or(0, HashSet::len)
    }
}
