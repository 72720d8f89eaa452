use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tokio::sync::RwLock;

use crate::models::game::{Game, GameStatus};
use crate::repositories::errors::game_repository_errors::GameRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Durable store of game records. Updates are conditional on the version the
/// writer read, so two writers can never silently overwrite each other.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError>;

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError>;

    /// Replaces the stored record with `game` if the stored version still
    /// equals `expected_version`.
    async fn update_game(
        &self,
        game: &Game,
        expected_version: u64,
    ) -> Result<(), GameRepositoryError>;

    /// Active and completed games `user_id` plays in, most recently updated
    /// first, at most `limit`.
    async fn find_games_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Game>, GameRepositoryError>;
}

fn newest_first(games: &mut Vec<Game>, limit: usize) {
    games.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    games.truncate(limit);
}

pub struct DynamoDbGameRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl GameRepository for DynamoDbGameRepository {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let item = serde_dynamo::to_item(game)
            .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(game_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let conflict = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conflict {
                    Err(GameRepositoryError::AlreadyExists)
                } else {
                    Err(GameRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("game_id", AttributeValue::S(game_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let game: Game = serde_dynamo::from_item(item)
                .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(game))
        } else {
            Ok(None)
        }
    }

    async fn update_game(
        &self,
        game: &Game,
        expected_version: u64,
    ) -> Result<(), GameRepositoryError> {
        let item = serde_dynamo::to_item(game)
            .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(game_id) AND version = :expected")
            .expression_attribute_values(
                ":expected",
                AttributeValue::N(expected_version.to_string()),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let conflict = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conflict {
                    Err(GameRepositoryError::VersionConflict)
                } else {
                    Err(GameRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn find_games_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Game>, GameRepositoryError> {
        let mut games = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression(
                    "(player_white_id = :user OR player_black_id = :user) \
                     AND #status IN (:active, :completed)",
                )
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":user", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":active", AttributeValue::S("active".to_string()))
                .expression_attribute_values(
                    ":completed",
                    AttributeValue::S("completed".to_string()),
                )
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| GameRepositoryError::DynamoDb(e.to_string()))?;

            let page: Vec<Game> = serde_dynamo::from_items(output.items.unwrap_or_default())
                .map_err(|e| GameRepositoryError::Serialization(e.to_string()))?;
            games.extend(page);

            match output.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }
        newest_first(&mut games, limit);
        Ok(games)
    }
}

/// Process-local store used for local runs and tests.
#[derive(Default)]
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<String, Game>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.game_id) {
            return Err(GameRepositoryError::AlreadyExists);
        }
        games.insert(game.game_id.clone(), game.clone());
        Ok(())
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn update_game(
        &self,
        game: &Game,
        expected_version: u64,
    ) -> Result<(), GameRepositoryError> {
        let mut games = self.games.write().await;
        match games.get_mut(&game.game_id) {
            Some(stored) if stored.version == expected_version => {
                *stored = game.clone();
                Ok(())
            }
            Some(_) => Err(GameRepositoryError::VersionConflict),
            None => Err(GameRepositoryError::NotFound),
        }
    }

    async fn find_games_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Game>, GameRepositoryError> {
        let mut games: Vec<Game> = self
            .games
            .read()
            .await
            .values()
            .filter(|g| g.is_participant(user_id) && g.status != GameStatus::Waiting)
            .cloned()
            .collect();
        newest_first(&mut games, limit);
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::{TimeControl, TimeControlKind};

    fn game() -> Game {
        Game::new_active("w", "b", TimeControl::new(TimeControlKind::TenMinutes))
    }

    #[tokio::test]
    async fn test_in_memory_create_and_get() {
        let repo = InMemoryGameRepository::new();
        let game = game();

        repo.create_game(&game).await.unwrap();

        assert_eq!(repo.get_game(&game.game_id).await.unwrap(), Some(game.clone()));
        assert_eq!(
            repo.create_game(&game).await,
            Err(GameRepositoryError::AlreadyExists)
        );
        assert_eq!(repo.get_game("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_update_checks_version() {
        let repo = InMemoryGameRepository::new();
        let mut game = game();
        repo.create_game(&game).await.unwrap();

        game.move_history.push("e4".to_string());
        game.version = 1;
        repo.update_game(&game, 0).await.unwrap();

        game.version = 2;
        assert_eq!(
            repo.update_game(&game, 0).await,
            Err(GameRepositoryError::VersionConflict)
        );
        let stored = repo.get_game(&game.game_id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.move_history, vec!["e4".to_string()]);
    }

    #[tokio::test]
    async fn test_games_for_user_newest_first() {
        let repo = InMemoryGameRepository::new();
        let mut older = game();
        older.updated_at = older.updated_at - chrono::Duration::minutes(5);
        let newer = game();
        let mut waiting = game();
        waiting.status = GameStatus::Waiting;
        let other = Game::new_active("x", "y", TimeControl::new(TimeControlKind::TenMinutes));
        for g in [&older, &newer, &waiting, &other] {
            repo.create_game(g).await.unwrap();
        }

        let found = repo.find_games_for_user("b", 50).await.unwrap();
        let limited = repo.find_games_for_user("w", 1).await.unwrap();

        let ids: Vec<&str> = found.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec![newer.game_id.as_str(), older.game_id.as_str()]);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].game_id, newer.game_id);
    }

    #[tokio::test]
    async fn test_in_memory_update_missing_game() {
        let repo = InMemoryGameRepository::new();

        assert_eq!(
            repo.update_game(&game(), 0).await,
            Err(GameRepositoryError::NotFound)
        );
    }
}
