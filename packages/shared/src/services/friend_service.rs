use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    models::user::{FriendRequest, FriendRequestStatus, User, UserProfile},
    repositories::user_repository::UserRepository,
    services::errors::friend_service_errors::FriendServiceError,
};

/// Read-modify-write passes tried before giving up on a contended record.
const WRITE_ATTEMPTS: usize = 5;

pub struct FriendService {
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl FriendService {
    pub fn new(users: Arc<dyn UserRepository + Send + Sync>) -> Self {
        FriendService { users }
    }

    pub async fn send_request(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> Result<(), FriendServiceError> {
        if from_id == to_id {
            return Err(FriendServiceError::CannotBefriendSelf);
        }
        for _ in 0..WRITE_ATTEMPTS {
            match self.try_send_request(from_id, to_id).await {
                Err(FriendServiceError::Conflict) => {
                    debug!("Friend request {} -> {} raced, retrying", from_id, to_id);
                }
                Ok(()) => {
                    info!("Friend request sent: {} -> {}", from_id, to_id);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        Err(FriendServiceError::Conflict)
    }

    /// Answers the pending request `from_id` sent to `user_id`. On accept
    /// both friend lists change in one write.
    pub async fn respond(
        &self,
        user_id: &str,
        from_id: &str,
        accept: bool,
    ) -> Result<User, FriendServiceError> {
        for _ in 0..WRITE_ATTEMPTS {
            match self.try_respond(user_id, from_id, accept).await {
                Err(FriendServiceError::Conflict) => {
                    debug!("Answer to {} -> {} raced, retrying", from_id, user_id);
                }
                Ok(user) => {
                    info!(
                        "Friend request {} -> {} {}",
                        from_id,
                        user_id,
                        if accept { "accepted" } else { "rejected" }
                    );
                    return Ok(user);
                }
                Err(e) => return Err(e),
            }
        }
        Err(FriendServiceError::Conflict)
    }

    /// One read-check-write pass. The write fails with `Conflict` when either
    /// record changed since it was read.
    async fn try_send_request(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> Result<(), FriendServiceError> {
        let mut sender = self.users.get_user_by_id(from_id).await?;
        let mut target = self.users.get_user_by_id(to_id).await?;

        if sender.is_friend_of(to_id) {
            return Err(FriendServiceError::AlreadyFriends);
        }
        if sender.sent_friend_requests.iter().any(|id| id == to_id)
            || target.pending_request_from(from_id).is_some()
        {
            return Err(FriendServiceError::RequestAlreadySent);
        }
        if sender.pending_request_from(to_id).is_some() {
            return Err(FriendServiceError::IncomingRequestPending);
        }

        target.friend_requests.push(FriendRequest {
            from: from_id.to_string(),
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
        });
        sender.sent_friend_requests.push(to_id.to_string());
        self.users.save_users(&[sender, target]).await?;
        Ok(())
    }

    async fn try_respond(
        &self,
        user_id: &str,
        from_id: &str,
        accept: bool,
    ) -> Result<User, FriendServiceError> {
        let mut user = self.users.get_user_by_id(user_id).await?;
        let request = user
            .friend_requests
            .iter_mut()
            .find(|r| r.from == from_id && r.status == FriendRequestStatus::Pending)
            .ok_or(FriendServiceError::RequestNotFound)?;
        request.status = if accept {
            FriendRequestStatus::Accepted
        } else {
            FriendRequestStatus::Rejected
        };

        let mut sender = self.users.get_user_by_id(from_id).await?;
        sender.sent_friend_requests.retain(|id| id != user_id);
        if accept {
            user.add_friend(from_id);
            sender.add_friend(user_id);
        }

        self.users.save_users(&[user.clone(), sender]).await?;
        user.version += 1;
        Ok(user)
    }

    pub async fn list_friends(&self, user_id: &str) -> Result<Vec<UserProfile>, FriendServiceError> {
        let user = self.users.get_user_by_id(user_id).await?;
        let mut friends = Vec::with_capacity(user.friends.len());
        for friend_id in &user.friends {
            let friend = self.users.get_user_by_id(friend_id).await?;
            friends.push(UserProfile::from(&friend));
        }
        Ok(friends)
    }
}
