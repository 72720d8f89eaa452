use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::TimeControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge_id: String,
    pub challenger_id: String,
    pub challenged_id: String,
    pub time_control: TimeControl,
    pub status: ChallengeStatus,
    pub game_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(
        challenger_id: &str,
        challenged_id: &str,
        time_control: TimeControl,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Challenge {
            challenge_id: Uuid::new_v4().to_string(),
            challenger_id: challenger_id.to_string(),
            challenged_id: challenged_id.to_string(),
            time_control,
            status: ChallengeStatus::Pending,
            game_id: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Pending and not yet past its expiry.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ChallengeStatus::Pending && !self.is_expired_at(now)
    }

    /// Identifies the unordered pair of players.
    pub fn pair_key(&self) -> String {
        let (low, high) = if self.challenger_id <= self.challenged_id {
            (&self.challenger_id, &self.challenged_id)
        } else {
            (&self.challenged_id, &self.challenger_id)
        };
        format!("{}#{}", low, high)
    }

    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.challenger_id == a && self.challenged_id == b)
            || (self.challenger_id == b && self.challenged_id == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::TimeControlKind;

    #[test]
    fn test_new_challenge_expires_after_ttl() {
        let challenge = Challenge::new(
            "a",
            "b",
            TimeControl::new(TimeControlKind::TenMinutes),
            Duration::minutes(5),
        );

        assert_eq!(challenge.status, ChallengeStatus::Pending);
        assert_eq!(challenge.expires_at - challenge.created_at, Duration::minutes(5));
        assert!(challenge.is_open_at(challenge.created_at));
        assert!(!challenge.is_open_at(challenge.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_involves_pair_is_unordered() {
        let challenge = Challenge::new(
            "a",
            "b",
            TimeControl::new(TimeControlKind::Unlimited),
            Duration::minutes(5),
        );

        assert!(challenge.involves_pair("a", "b"));
        assert!(challenge.involves_pair("b", "a"));
        assert!(!challenge.involves_pair("a", "c"));
    }

    #[test]
    fn test_pair_key_ignores_direction() {
        let ttl = Duration::minutes(5);
        let control = TimeControl::new(TimeControlKind::Unlimited);

        let forward = Challenge::new("a", "b", control, ttl);
        let backward = Challenge::new("b", "a", control, ttl);

        assert_eq!(forward.pair_key(), "a#b");
        assert_eq!(forward.pair_key(), backward.pair_key());
    }
}
