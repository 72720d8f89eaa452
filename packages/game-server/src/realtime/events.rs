use serde::{Deserialize, Serialize};

use shared::models::challenge::Challenge;
use shared::models::game::Color;
use shared::models::move_request::MoveRequest;
use shared::models::user::UserProfile;
use shared::services::game_session_service::{GameOver, GameSnapshot, MoveOutcome};

/// Messages a client may send over its socket.
///
/// Every message is `{"event": "<name>", "data": {...}}`. `user_id` fields
/// are optional, but when present they must name the authenticated user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinUser {
        user_id: String,
    },
    JoinGame {
        game_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    MakeMove {
        game_id: String,
        #[serde(rename = "move")]
        mv: MoveRequest,
        #[serde(default)]
        user_id: Option<String>,
    },
    Resign {
        game_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    OfferDraw {
        game_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    AcceptDraw {
        game_id: String,
    },
    DeclineDraw {
        game_id: String,
    },
    TimeUpdate {
        game_id: String,
        white_seconds: u64,
        black_seconds: u64,
    },
    RequestSync {
        game_id: String,
    },
}

impl ClientEvent {
    /// The user id the client claims to act as, if it sent one.
    pub fn claimed_user(&self) -> Option<&str> {
        match self {
            ClientEvent::JoinUser { user_id } => Some(user_id),
            ClientEvent::JoinGame { user_id, .. }
            | ClientEvent::MakeMove { user_id, .. }
            | ClientEvent::Resign { user_id, .. }
            | ClientEvent::OfferDraw { user_id, .. } => user_id.as_deref(),
            _ => None,
        }
    }
}

/// A move together with the position it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveMade {
    pub san: String,
    pub uci: String,
    pub mover: Color,
    pub captured: Option<String>,
    #[serde(flatten)]
    pub game: GameSnapshot,
}

impl From<&MoveOutcome> for MoveMade {
    fn from(outcome: &MoveOutcome) -> Self {
        MoveMade {
            san: outcome.san.clone(),
            uci: outcome.uci.clone(),
            mover: outcome.mover,
            captured: outcome.captured.clone(),
            game: outcome.snapshot.clone(),
        }
    }
}

/// Messages pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame on every socket, sent once the connection is registered.
    Connected {
        user_id: String,
    },
    GameState(GameSnapshot),
    MoveMade(MoveMade),
    GameOver(GameOver),
    PlayerResigned {
        game_id: String,
        user_id: String,
        color: Color,
    },
    DrawOffered {
        game_id: String,
        by: Color,
    },
    DrawAccepted {
        game_id: String,
    },
    DrawDeclined {
        game_id: String,
        by: Color,
    },
    TimeSync {
        game_id: String,
        time_remaining_white: u64,
        time_remaining_black: u64,
    },
    MatchFound {
        game_id: String,
        opponent_id: String,
        color: Color,
    },
    QueueExpired {
        user_id: String,
    },
    ChallengeReceived {
        challenge: Challenge,
    },
    ChallengeAccepted {
        challenge: Challenge,
        game_id: String,
    },
    ChallengeRejected {
        challenge: Challenge,
    },
    FriendRequestReceived {
        from: UserProfile,
    },
    FriendRequestAccepted {
        by: UserProfile,
    },
    FriendRequestRejected {
        by: UserProfile,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_make_move_in_both_notations() {
        let squares: ClientEvent = serde_json::from_value(json!({
            "event": "make-move",
            "data": {"game_id": "g1", "move": {"from": "e2", "to": "e4"}}
        }))
        .unwrap();
        let notation: ClientEvent = serde_json::from_value(json!({
            "event": "make-move",
            "data": {"game_id": "g1", "move": "Nf3", "user_id": "u1"}
        }))
        .unwrap();

        assert!(matches!(
            squares,
            ClientEvent::MakeMove { mv: MoveRequest::Squares { .. }, user_id: None, .. }
        ));
        assert_eq!(notation.claimed_user(), Some("u1"));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({
            "event": "teleport-king",
            "data": {}
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_envelope() {
        let event = ServerEvent::DrawOffered {
            game_id: "g1".to_string(),
            by: Color::White,
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "draw-offered", "data": {"game_id": "g1", "by": "white"}})
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::error("nope")).unwrap(),
            json!({"event": "error", "data": {"message": "nope"}})
        );
    }
}
