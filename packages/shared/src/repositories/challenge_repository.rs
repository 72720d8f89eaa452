use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_item};
use tokio::sync::RwLock;

use crate::models::challenge::{Challenge, ChallengeStatus};
use crate::repositories::errors::challenge_repository_errors::ChallengeRepositoryError;

/// Pair claims share the challenges table; their ids carry this prefix.
const PAIR_CLAIM_PREFIX: &str = "pair#";

/// Durable store of challenges. A pending challenge holds a claim on its
/// unordered pair of players until it leaves the pending state.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Stores a new pending challenge and claims its pair. Fails with
    /// `PairTaken` while another pending challenge holds the pair.
    async fn create_challenge(&self, challenge: &Challenge)
        -> Result<(), ChallengeRepositoryError>;

    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError>;

    /// Replaces a stored pending challenge with `challenge`, which carries
    /// its new status, and releases the pair. Fails with `NotPending` when
    /// the stored challenge already left the pending state.
    async fn settle_challenge(&self, challenge: &Challenge)
        -> Result<(), ChallengeRepositoryError>;

    /// Challenges still marked pending between the two users, in either
    /// direction. Expiry is not evaluated here.
    async fn find_pending_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError>;

    /// Challenges still marked pending where `user_id` is the challenged
    /// player.
    async fn find_pending_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError>;
}

pub struct DynamoDbChallengeRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbChallengeRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    fn claim_key(&self, challenge: &Challenge) -> AttributeValue {
        AttributeValue::S(format!("{}{}", PAIR_CLAIM_PREFIX, challenge.pair_key()))
    }

    async fn scan_pending(
        &self,
        filter: &str,
        values: Vec<(&str, String)>,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        let mut request = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression(format!("#status = :pending AND ({})", filter))
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":pending", AttributeValue::S("pending".to_string()));
        for (name, value) in values {
            request = request.expression_attribute_values(name, AttributeValue::S(value));
        }

        let output = request
            .send()
            .await
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;

        let items = output.items.unwrap_or_default();
        from_items(items).map_err(|e| ChallengeRepositoryError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ChallengeRepository for DynamoDbChallengeRepository {
    async fn create_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        let item = to_item(challenge)
            .map_err(|e| ChallengeRepositoryError::Serialization(e.to_string()))?;
        let record = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(challenge_id)")
            .build()
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;
        let claim = Put::builder()
            .table_name(&self.table_name)
            .item("challenge_id", self.claim_key(challenge))
            .item("holder", AttributeValue::S(challenge.challenge_id.clone()))
            .condition_expression("attribute_not_exists(challenge_id)")
            .build()
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;

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
                    Err(ChallengeRepositoryError::PairTaken)
                } else {
                    Err(ChallengeRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("challenge_id", AttributeValue::S(challenge_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                let challenge = from_item(item)
                    .map_err(|e| ChallengeRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(challenge))
            }
            None => Ok(None),
        }
    }

    async fn settle_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        let item = to_item(challenge)
            .map_err(|e| ChallengeRepositoryError::Serialization(e.to_string()))?;
        let record = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("#status = :pending")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":pending", AttributeValue::S("pending".to_string()))
            .build()
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;
        let release = Delete::builder()
            .table_name(&self.table_name)
            .key("challenge_id", self.claim_key(challenge))
            .condition_expression("holder = :holder")
            .expression_attribute_values(
                ":holder",
                AttributeValue::S(challenge.challenge_id.clone()),
            )
            .build()
            .map_err(|e| ChallengeRepositoryError::DynamoDb(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(record).build())
            .transact_items(TransactWriteItem::builder().delete(release).build())
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
                    Err(ChallengeRepositoryError::NotPending)
                } else {
                    Err(ChallengeRepositoryError::DynamoDb(e.to_string()))
                }
            }
        }
    }

    async fn find_pending_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        self.scan_pending(
            "(challenger_id = :a AND challenged_id = :b) OR (challenger_id = :b AND challenged_id = :a)",
            vec![(":a", user_a.to_string()), (":b", user_b.to_string())],
        )
        .await
    }

    async fn find_pending_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        self.scan_pending("challenged_id = :user", vec![(":user", user_id.to_string())])
            .await
    }
}

#[derive(Default)]
struct StoredChallenges {
    challenges: HashMap<String, Challenge>,
    /// Pair key to the id of the pending challenge holding it.
    claims: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryChallengeRepository {
    state: RwLock<StoredChallenges>,
}

impl InMemoryChallengeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryChallengeRepository {
    async fn create_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        let mut state = self.state.write().await;
        let pair = challenge.pair_key();
        if state.claims.contains_key(&pair) {
            return Err(ChallengeRepositoryError::PairTaken);
        }
        state.claims.insert(pair, challenge.challenge_id.clone());
        state
            .challenges
            .insert(challenge.challenge_id.clone(), challenge.clone());
        Ok(())
    }

    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError> {
        Ok(self.state.read().await.challenges.get(challenge_id).cloned())
    }

    async fn settle_challenge(
        &self,
        challenge: &Challenge,
    ) -> Result<(), ChallengeRepositoryError> {
        let mut state = self.state.write().await;
        match state.challenges.get_mut(&challenge.challenge_id) {
            Some(stored) if stored.status == ChallengeStatus::Pending => {
                *stored = challenge.clone();
            }
            Some(_) => return Err(ChallengeRepositoryError::NotPending),
            None => return Err(ChallengeRepositoryError::NotFound),
        }
        let pair = challenge.pair_key();
        if state.claims.get(&pair) == Some(&challenge.challenge_id) {
            state.claims.remove(&pair);
        }
        Ok(())
    }

    async fn find_pending_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .challenges
            .values()
            .filter(|c| c.status == ChallengeStatus::Pending && c.involves_pair(user_a, user_b))
            .cloned()
            .collect())
    }

    async fn find_pending_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        let mut pending: Vec<Challenge> = self
            .state
            .read()
            .await
            .challenges
            .values()
            .filter(|c| c.status == ChallengeStatus::Pending && c.challenged_id == user_id)
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.created_at);
        Ok(pending)
    }
}
