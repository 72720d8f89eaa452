//! Repository wrapper that yields to the scheduler before every call, so
//! concurrent callers in tests interleave at each storage round trip.

use async_trait::async_trait;
use tokio::task::yield_now;

use crate::models::challenge::Challenge;
use crate::models::user::User;
use crate::repositories::challenge_repository::ChallengeRepository;
use crate::repositories::errors::challenge_repository_errors::ChallengeRepositoryError;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::{RatingUpdate, UserRepository};

pub(crate) struct Yielding<R>(pub R);

#[async_trait]
impl<R: UserRepository> UserRepository for Yielding<R> {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        yield_now().await;
        self.0.create_user(user).await
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        yield_now().await;
        self.0.get_user_by_id(user_id).await
    }

    async fn search_users(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<User>, UserRepositoryError> {
        yield_now().await;
        self.0.search_users(query, limit).await
    }

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> Result<(), UserRepositoryError> {
        yield_now().await;
        self.0.update_ratings(updates).await
    }

    async fn save_users(&self, users: &[User]) -> Result<(), UserRepositoryError> {
        yield_now().await;
        self.0.save_users(users).await
    }
}

#[async_trait]
impl<R: ChallengeRepository> ChallengeRepository for Yielding<R> {
    async fn create_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        yield_now().await;
        self.0.create_challenge(challenge).await
    }

    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError> {
        yield_now().await;
        self.0.get_challenge(challenge_id).await
    }

    async fn settle_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        yield_now().await;
        self.0.settle_challenge(challenge).await
    }

    async fn find_pending_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        yield_now().await;
        self.0.find_pending_between(user_a, user_b).await
    }

    async fn find_pending_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        yield_now().await;
        self.0.find_pending_for(user_id).await
    }
}
