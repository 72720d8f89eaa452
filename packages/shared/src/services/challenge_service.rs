use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info};

use crate::{
    models::{
        challenge::{Challenge, ChallengeStatus},
        game::{Game, TimeControl},
    },
    repositories::{
        challenge_repository::ChallengeRepository,
        errors::challenge_repository_errors::ChallengeRepositoryError,
        game_repository::GameRepository, user_repository::UserRepository,
    },
    services::errors::challenge_service_errors::ChallengeServiceError,
};

pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// Result of answering a challenge. `game` is set when it was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeResponse {
    pub challenge: Challenge,
    pub game: Option<Game>,
}

pub struct ChallengeService {
    challenges: Arc<dyn ChallengeRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    games: Arc<dyn GameRepository + Send + Sync>,
    ttl: Duration,
}

impl ChallengeService {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
    ) -> Self {
        ChallengeService {
            challenges,
            users,
            games,
            ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn create_challenge(
        &self,
        challenger_id: &str,
        challenged_id: &str,
        time_control: TimeControl,
    ) -> Result<Challenge, ChallengeServiceError> {
        if challenger_id == challenged_id {
            return Err(ChallengeServiceError::ValidationError(
                "You cannot challenge yourself".to_string(),
            ));
        }
        time_control
            .validate()
            .map_err(ChallengeServiceError::ValidationError)?;

        let challenger = self.users.get_user_by_id(challenger_id).await?;
        self.users.get_user_by_id(challenged_id).await?;
        if !challenger.is_friend_of(challenged_id) {
            return Err(ChallengeServiceError::NotFriends);
        }

        let now = Utc::now();
        for pending in self
            .challenges
            .find_pending_between(challenger_id, challenged_id)
            .await?
        {
            if pending.is_open_at(now) {
                return Err(ChallengeServiceError::AlreadyPending);
            }
            self.expire(pending).await?;
        }

        // The repository claims the pair atomically, so a racing challenge in
        // either direction surfaces as AlreadyPending here.
        let challenge = Challenge::new(challenger_id, challenged_id, time_control, self.ttl);
        self.challenges.create_challenge(&challenge).await?;
        info!(
            "Challenge {} created: {} -> {}",
            challenge.challenge_id, challenger_id, challenged_id
        );
        Ok(challenge)
    }

    /// Accepts or rejects a pending challenge on behalf of the challenged
    /// player. Accepting creates the game.
    pub async fn respond(
        &self,
        challenge_id: &str,
        user_id: &str,
        accept: bool,
    ) -> Result<ChallengeResponse, ChallengeServiceError> {
        let mut challenge = self
            .challenges
            .get_challenge(challenge_id)
            .await?
            .ok_or(ChallengeServiceError::ChallengeNotFound)?;

        if challenge.challenged_id != user_id {
            return Err(ChallengeServiceError::Unauthorized);
        }
        if challenge.status != ChallengeStatus::Pending {
            return Err(ChallengeServiceError::NotPending);
        }
        if challenge.is_expired_at(Utc::now()) {
            self.expire(challenge).await?;
            return Err(ChallengeServiceError::ChallengeExpired);
        }

        let game = if accept {
            let (game, _) = Game::with_random_colors(
                &challenge.challenger_id,
                &challenge.challenged_id,
                challenge.time_control,
            );
            challenge.status = ChallengeStatus::Accepted;
            challenge.game_id = Some(game.game_id.clone());
            Some(game)
        } else {
            challenge.status = ChallengeStatus::Rejected;
            None
        };
        // Settling fails unless the stored challenge is still pending, so at
        // most one response wins and creates a game.
        self.challenges.settle_challenge(&challenge).await?;
        if let Some(game) = &game {
            self.games.create_game(game).await.map_err(|e| {
                error!(
                    "Game {} for accepted challenge {} was not stored: {}",
                    game.game_id, challenge.challenge_id, e
                );
                ChallengeServiceError::from(e)
            })?;
        }
        info!("Challenge {} {:?}", challenge.challenge_id, challenge.status);

        Ok(ChallengeResponse { challenge, game })
    }

    /// Open challenges addressed to `user_id`, oldest first. Stale ones are
    /// marked expired on the way.
    pub async fn list_pending(&self, user_id: &str) -> Result<Vec<Challenge>, ChallengeServiceError> {
        let now = Utc::now();
        let mut open = Vec::new();
        for challenge in self.challenges.find_pending_for(user_id).await? {
            if challenge.is_open_at(now) {
                open.push(challenge);
            } else {
                self.expire(challenge).await?;
            }
        }
        open.sort_by_key(|c| c.created_at);
        Ok(open)
    }

    /// Marks a stale challenge expired. Losing the race to another writer
    /// that already settled it is fine.
    async fn expire(&self, mut challenge: Challenge) -> Result<(), ChallengeServiceError> {
        challenge.status = ChallengeStatus::Expired;
        match self.challenges.settle_challenge(&challenge).await {
            Ok(()) => {
                debug!("Challenge {} expired", challenge.challenge_id);
                Ok(())
            }
            Err(ChallengeRepositoryError::NotPending) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
