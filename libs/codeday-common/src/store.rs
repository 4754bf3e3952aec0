//! Challenge persistence seam
//!
//! The grading engine never owns challenge state. Callers hand it a
//! `ChallengeStore` and the engine only ever:
//! - reads a challenge by `day`
//! - issues one `mark_completed` write after a passing verdict
//!
//! `mark_completed` must set `completed`, `user_name` and `completed_at`
//! in a single atomic write so concurrent passers cannot interleave.

use crate::types::Challenge;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt record for day {day}: {reason}")]
    Corrupt { day: u32, reason: String },
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert challenges whose day is not present yet; returns how many were inserted
    async fn seed(&self, challenges: &[Challenge]) -> Result<usize, StoreError>;

    /// All challenges ordered by day
    async fn list(&self) -> Result<Vec<Challenge>, StoreError>;

    async fn get(&self, day: u32) -> Result<Option<Challenge>, StoreError>;

    /// Returns false if no challenge exists for `day`
    async fn mark_completed(&self, day: u32, learner_name: &str) -> Result<bool, StoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    challenges: RwLock<BTreeMap<u32, Challenge>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_challenges(challenges: Vec<Challenge>) -> Self {
        let map = challenges.into_iter().map(|c| (c.day, c)).collect();
        Self {
            challenges: RwLock::new(map),
        }
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn seed(&self, challenges: &[Challenge]) -> Result<usize, StoreError> {
        let mut map = self.challenges.write().await;
        let mut inserted = 0;
        for challenge in challenges {
            if !map.contains_key(&challenge.day) {
                map.insert(challenge.day, challenge.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list(&self) -> Result<Vec<Challenge>, StoreError> {
        Ok(self.challenges.read().await.values().cloned().collect())
    }

    async fn get(&self, day: u32) -> Result<Option<Challenge>, StoreError> {
        Ok(self.challenges.read().await.get(&day).cloned())
    }

    async fn mark_completed(&self, day: u32, learner_name: &str) -> Result<bool, StoreError> {
        let mut map = self.challenges.write().await;
        match map.get_mut(&day) {
            Some(challenge) => {
                challenge.completed = true;
                challenge.user_name = Some(learner_name.to_string());
                challenge.completed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
