use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tokio::sync::RwLock;

use crate::models::user::{username_key, User};
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Claim items share the users table; their ids carry this prefix.
const USERNAME_CLAIM_PREFIX: &str = "username#";

/// A rating adjustment, applied on top of whatever the stored rating is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingUpdate {
    pub user_id: String,
    pub delta: i32,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user and claims its username. Fails with `AlreadyExists`
    /// when the id or the case-folded username is taken.
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError>;

    /// Users whose username contains `query`, ignoring case, at most `limit`.
    async fn search_users(&self, query: &str, limit: usize)
        -> Result<Vec<User>, UserRepositoryError>;

    /// Adds every delta to the stored rating in one committed operation:
    /// either all users are updated or none are.
    async fn update_ratings(&self, updates: &[RatingUpdate]) -> Result<(), UserRepositoryError>;

    /// Replaces several user records in one committed operation. Each record
    /// must still carry the stored `version`; otherwise nothing is written
    /// and `VersionConflict` is returned.
    async fn save_users(&self, users: &[User]) -> Result<(), UserRepositoryError>;
}

pub struct DynamoDbUserRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let item = to_item(user).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
        let record = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
        let claim = Put::builder()
            .table_name(&self.table_name)
            .item(
                "id",
                AttributeValue::S(format!(
                    "{}{}",
                    USERNAME_CLAIM_PREFIX,
                    username_key(&user.username)
                )),
            )
            .item("user_id", AttributeValue::S(user.id.clone()))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(record).build())
            .transact_items(TransactWriteItem::builder().put(claim).build())
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let cancelled = e
                    .as_service_error()
                    .map(|se| se.is_transaction_canceled_exception())
                    .unwrap_or(false);
                if cancelled {
                    Err(UserRepositoryError::AlreadyExists)
                } else {
                    Err(UserRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(user_id)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
        if let Some(item) = output.item {
            let user: User =
                from_item(item).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
            Ok(user)
        } else {
            Err(UserRepositoryError::NotFound)
        }
    }

    async fn search_users(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let needle = query.to_lowercase();
        let mut found = Vec::new();
        let mut start_key = None;
        loop {
            // DynamoDB `contains` is case sensitive, so matching happens here.
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("attribute_exists(username)")
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let user: User = from_item(item)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
                if user.username.to_lowercase().contains(&needle) {
                    found.push(user);
                    if found.len() >= limit {
                        return Ok(found);
                    }
                }
            }

            match output.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(found),
            }
        }
    }

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> Result<(), UserRepositoryError> {
        let mut items = Vec::with_capacity(updates.len());
        for update in updates {
            let write = Update::builder()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(update.user_id.clone()))
                .update_expression("ADD rating :delta, version :one")
                .condition_expression("attribute_exists(id)")
                .expression_attribute_values(":delta", AttributeValue::N(update.delta.to_string()))
                .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
                .build()
                .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
            items.push(TransactWriteItem::builder().update(write).build());
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let cancelled = e
                    .as_service_error()
                    .map(|se| se.is_transaction_canceled_exception())
                    .unwrap_or(false);
                if cancelled {
                    Err(UserRepositoryError::NotFound)
                } else {
                    Err(UserRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn save_users(&self, users: &[User]) -> Result<(), UserRepositoryError> {
        let mut items = Vec::with_capacity(users.len());
        for user in users {
            let next = User {
                version: user.version + 1,
                ..user.clone()
            };
            let item =
                to_item(&next).map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
            // Records written before versioning carry no version attribute.
            let condition = if user.version == 0 {
                "attribute_exists(id) AND (attribute_not_exists(version) OR version = :expected)"
            } else {
                "attribute_exists(id) AND version = :expected"
            };
            let write = Put::builder()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression(condition)
                .expression_attribute_values(
                    ":expected",
                    AttributeValue::N(user.version.to_string()),
                )
                .build()
                .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;
            items.push(TransactWriteItem::builder().put(write).build());
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let cancelled = e
                    .as_service_error()
                    .map(|se| se.is_transaction_canceled_exception())
                    .unwrap_or(false);
                if cancelled {
                    Err(UserRepositoryError::VersionConflict)
                } else {
                    Err(UserRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut users = self.users.write().await;
        let key = username_key(&user.username);
        if users.contains_key(&user.id)
            || users.values().any(|u| username_key(&u.username) == key)
        {
            return Err(UserRepositoryError::AlreadyExists);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<User, UserRepositoryError> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or(UserRepositoryError::NotFound)
    }

    async fn search_users(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let needle = query.to_lowercase();
        let mut found: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.username.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit);
        Ok(found)
    }

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> Result<(), UserRepositoryError> {
        let mut users = self.users.write().await;
        if updates.iter().any(|u| !users.contains_key(&u.user_id)) {
            return Err(UserRepositoryError::NotFound);
        }
        for update in updates {
            if let Some(user) = users.get_mut(&update.user_id) {
                user.rating += update.delta;
                user.version += 1;
            }
        }
        Ok(())
    }

    async fn save_users(&self, to_save: &[User]) -> Result<(), UserRepositoryError> {
        let mut users = self.users.write().await;
        for user in to_save {
            match users.get(&user.id) {
                Some(stored) if stored.version == user.version => {}
                Some(_) => return Err(UserRepositoryError::VersionConflict),
                None => return Err(UserRepositoryError::NotFound),
            }
        }
        for user in to_save {
            let next = User {
                version: user.version + 1,
                ..user.clone()
            };
            users.insert(user.id.clone(), next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_ratings_is_all_or_nothing() {
        let repo = InMemoryUserRepository::new();
        let alice = User::new("alice".to_string());
        repo.create_user(&alice).await.unwrap();

        let result = repo
            .update_ratings(&[
                RatingUpdate {
                    user_id: alice.id.clone(),
                    delta: 16,
                },
                RatingUpdate {
                    user_id: "ghost".to_string(),
                    delta: -16,
                },
            ])
            .await;

        assert_eq!(result, Err(UserRepositoryError::NotFound));
        assert_eq!(repo.get_user_by_id(&alice.id).await.unwrap().rating, 1200);
    }

    #[tokio::test]
    async fn test_update_ratings_adds_deltas() {
        let repo = InMemoryUserRepository::new();
        let alice = User::new("alice".to_string());
        let bob = User::new("bob".to_string());
        repo.create_user(&alice).await.unwrap();
        repo.create_user(&bob).await.unwrap();
        let update = [
            RatingUpdate {
                user_id: alice.id.clone(),
                delta: 16,
            },
            RatingUpdate {
                user_id: bob.id.clone(),
                delta: -16,
            },
        ];

        repo.update_ratings(&update).await.unwrap();
        repo.update_ratings(&update).await.unwrap();

        let alice = repo.get_user_by_id(&alice.id).await.unwrap();
        assert_eq!(alice.rating, 1232);
        assert_eq!(alice.version, 2);
        assert_eq!(repo.get_user_by_id(&bob.id).await.unwrap().rating, 1168);
    }

    #[tokio::test]
    async fn test_create_duplicate_user() {
        let repo = InMemoryUserRepository::new();
        let user = User::new("carol".to_string());
        repo.create_user(&user).await.unwrap();

        assert_eq!(
            repo.create_user(&user).await,
            Err(UserRepositoryError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_username_is_claimed_ignoring_case() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&User::new("Carol".to_string())).await.unwrap();

        let result = repo.create_user(&User::new("carol".to_string())).await;

        assert_eq!(result, Err(UserRepositoryError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_save_users_rejects_stale_versions() {
        let repo = InMemoryUserRepository::new();
        let alice = User::new("alice".to_string());
        let bob = User::new("bob".to_string());
        repo.create_user(&alice).await.unwrap();
        repo.create_user(&bob).await.unwrap();

        let mut first = repo.get_user_by_id(&alice.id).await.unwrap();
        first.add_friend("x");
        repo.save_users(&[first]).await.unwrap();

        let mut stale = alice.clone();
        stale.add_friend("y");
        let mut bob_update = bob.clone();
        bob_update.add_friend("y");
        let result = repo.save_users(&[bob_update, stale]).await;

        assert_eq!(result, Err(UserRepositoryError::VersionConflict));
        let stored = repo.get_user_by_id(&alice.id).await.unwrap();
        assert_eq!(stored.friends, vec!["x".to_string()]);
        assert_eq!(stored.version, 1);
        assert!(repo.get_user_by_id(&bob.id).await.unwrap().friends.is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_case() {
        let repo = InMemoryUserRepository::new();
        for name in ["MagnusC", "magnolia", "hikaru"] {
            repo.create_user(&User::new(name.to_string())).await.unwrap();
        }

        let found = repo.search_users("MAG", 10).await.unwrap();
        let limited = repo.search_users("mag", 1).await.unwrap();

        let names: Vec<&str> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["MagnusC", "magnolia"]);
        assert_eq!(limited.len(), 1);
    }
}
