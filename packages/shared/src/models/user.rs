use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_RATING: i32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// An inbound friend request, stored on the recipient.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FriendRequest {
    pub from: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub rating: i32,
    #[serde(default)]
    pub friends: Vec<String>,
    #[serde(default)]
    pub friend_requests: Vec<FriendRequest>,
    #[serde(default)]
    pub sent_friend_requests: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped by every write; record replacements are conditional on it.
    #[serde(default)]
    pub version: u64,
}

impl User {
    pub fn new(username: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            username,
            rating: DEFAULT_RATING,
            friends: vec![],
            friend_requests: vec![],
            sent_friend_requests: vec![],
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn is_friend_of(&self, other_id: &str) -> bool {
        self.friends.iter().any(|f| f == other_id)
    }

    pub fn pending_request_from(&self, other_id: &str) -> Option<&FriendRequest> {
        self.friend_requests
            .iter()
            .find(|r| r.from == other_id && r.status == FriendRequestStatus::Pending)
    }

    /// Adds `other_id` to the friend set unless it is already there.
    pub fn add_friend(&mut self, other_id: &str) {
        if !self.is_friend_of(other_id) {
            self.friends.push(other_id.to_string());
        }
    }
}

/// Case-folded form of a username. Two usernames that fold to the same key
/// belong to the same account.
pub fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

/// The publicly visible part of a user record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub rating: i32,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            username: user.username.clone(),
            rating: user.rating,
        }
    }
}
