use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::{Color, TimeControl};

/// A player waiting in the matchmaking queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTicket {
    pub user_id: String,
    pub rating: i32,
    pub time_control: TimeControl,
    pub rating_band: i32,
    pub joined_at: DateTime<Utc>,
}

impl QueueTicket {
    pub fn new(user_id: &str, rating: i32, time_control: TimeControl, rating_band: i32) -> Self {
        QueueTicket {
            user_id: user_id.to_string(),
            rating,
            time_control,
            rating_band,
            joined_at: Utc::now(),
        }
    }

    /// Whether `rating` falls inside this ticket's acceptable band.
    pub fn accepts(&self, rating: i32) -> bool {
        (rating - self.rating).abs() <= self.rating_band
    }

    /// Both tickets want the same time control and each rating sits inside
    /// the other's band.
    pub fn pairs_with(&self, other: &QueueTicket) -> bool {
        self.user_id != other.user_id
            && self.time_control.matches(&other.time_control)
            && self.accepts(other.rating)
            && other.accepts(self.rating)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EnqueueOutcome {
    Matched {
        opponent_id: String,
        game_id: String,
        color: Color,
    },
    Queued,
}

/// Notifications produced by the queue outside of a direct enqueue reply.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Matched {
        user_id: String,
        opponent_id: String,
        game_id: String,
        color: Color,
    },
    Expired {
        user_id: String,
    },
}
