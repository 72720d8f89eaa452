use std::sync::Arc;

use crate::models::user::{User, UserProfile};
use crate::repositories::errors::user_repository_errors::UserRepositoryError;
use crate::repositories::user_repository::UserRepository;
use crate::services::errors::user_service_errors::UserServiceError;

const MIN_SEARCH_LEN: usize = 2;
const SEARCH_LIMIT: usize = 20;

pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        UserService { repository }
    }

    pub async fn create_user(&self, username: &str) -> Result<User, UserServiceError> {
        if username.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        let user = User::new(username.trim().to_string());
        self.repository
            .create_user(&user)
            .await
            .map_err(|e| match e {
                UserRepositoryError::AlreadyExists => UserServiceError::UserAlreadyExists,
                _ => UserServiceError::RepositoryError(e.to_string()),
            })?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserServiceError> {
        if user_id.is_empty() {
            return Err(UserServiceError::ValidationError(
                "User ID cannot be empty".to_string(),
            ));
        }
        self.repository
            .get_user_by_id(user_id)
            .await
            .map_err(|e| match e {
                UserRepositoryError::NotFound => UserServiceError::UserNotFound,
                _ => UserServiceError::RepositoryError(e.to_string()),
            })
    }

    /// Other users whose username contains `query`, ignoring case.
    pub async fn search_users(
        &self,
        caller_id: &str,
        query: &str,
    ) -> Result<Vec<UserProfile>, UserServiceError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Search query must be at least {} characters",
                MIN_SEARCH_LEN
            )));
        }
        // One extra row leaves room for the caller, who is filtered out.
        let users = self
            .repository
            .search_users(query, SEARCH_LIMIT + 1)
            .await
            .map_err(|e| UserServiceError::RepositoryError(e.to_string()))?;
        Ok(users
            .iter()
            .filter(|u| u.id != caller_id)
            .take(SEARCH_LIMIT)
            .map(UserProfile::from)
            .collect())
    }
}
