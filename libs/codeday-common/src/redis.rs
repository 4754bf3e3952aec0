use crate::store::{ChallengeStore, StoreError};
use crate::types::Challenge;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;

/// Redis key layout - keys are deterministic so any process sharing the
/// instance sees the same challenge set
///
/// - `codeday:challenge:<day>` hash, one per challenge
/// - `codeday:challenges` sorted set of days (score = day) for ordered listing

pub const CHALLENGE_PREFIX: &str = "codeday:challenge";
pub const CHALLENGE_INDEX: &str = "codeday:challenges";

/// Existence check and the multi-field write run as one script, so a key
/// removed in between can never be recreated as a partial hash
const MARK_COMPLETED_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'completed', '1', 'user_name', ARGV[1], 'completed_at', ARGV[2])
return 1
"#;

/// Generate hash key for a challenge
pub fn challenge_key(day: u32) -> String {
    format!("{}:{}", CHALLENGE_PREFIX, day)
}

fn field<'a>(
    fields: &'a HashMap<String, String>,
    day: u32,
    name: &str,
) -> Result<&'a String, StoreError> {
    fields.get(name).ok_or_else(|| StoreError::Corrupt {
        day,
        reason: format!("missing field '{}'", name),
    })
}

/// Rebuild a challenge from its hash. An empty hash means the key does not exist.
pub fn challenge_from_fields(
    day: u32,
    fields: &HashMap<String, String>,
) -> Result<Option<Challenge>, StoreError> {
    if fields.is_empty() {
        return Ok(None);
    }

    let completed = match fields.get("completed").map(String::as_str) {
        None | Some("0") => false,
        Some("1") => true,
        Some(other) => {
            return Err(StoreError::Corrupt {
                day,
                reason: format!("completed flag '{}'", other),
            })
        }
    };

    let completed_at = match fields.get("completed_at") {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| StoreError::Corrupt {
                    day,
                    reason: format!("completed_at: {}", e),
                })?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(Some(Challenge {
        day,
        title: field(fields, day, "title")?.clone(),
        description: field(fields, day, "description")?.clone(),
        sample_input: field(fields, day, "sample_input")?.clone(),
        expected_output: field(fields, day, "expected_output")?.clone(),
        completed,
        user_name: fields.get("user_name").cloned(),
        completed_at,
    }))
}

/// Challenge store backed by Redis hashes
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl ChallengeStore for RedisStore {
    /// HSETNX per field: an existing challenge keeps its progress
    async fn seed(&self, challenges: &[Challenge]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let mut inserted = 0;

        for challenge in challenges {
            let key = challenge_key(challenge.day);
            let (added,): (usize,) = redis::pipe()
                .atomic()
                .zadd(CHALLENGE_INDEX, challenge.day, challenge.day)
                .hset_nx(&key, "title", &challenge.title)
                .ignore()
                .hset_nx(&key, "description", &challenge.description)
                .ignore()
                .hset_nx(&key, "sample_input", &challenge.sample_input)
                .ignore()
                .hset_nx(&key, "expected_output", &challenge.expected_output)
                .ignore()
                .hset_nx(&key, "completed", "0")
                .ignore()
                .query_async(&mut conn)
                .await?;
            inserted += added;
        }

        Ok(inserted)
    }

    async fn list(&self) -> Result<Vec<Challenge>, StoreError> {
        let mut conn = self.conn.clone();
        let days: Vec<u32> = conn.zrange(CHALLENGE_INDEX, 0, -1).await?;

        let mut challenges = Vec::with_capacity(days.len());
        for day in days {
            let fields: HashMap<String, String> = conn.hgetall(challenge_key(day)).await?;
            if let Some(challenge) = challenge_from_fields(day, &fields)? {
                challenges.push(challenge);
            }
        }
        Ok(challenges)
    }

    async fn get(&self, day: u32) -> Result<Option<Challenge>, StoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(challenge_key(day)).await?;
        challenge_from_fields(day, &fields)
    }

    /// One server-side script, so `completed`/`user_name` never diverge
    async fn mark_completed(&self, day: u32, learner_name: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let completed_at = Utc::now().to_rfc3339();

        let updated: i64 = redis::Script::new(MARK_COMPLETED_SCRIPT)
            .key(challenge_key(day))
            .arg(learner_name)
            .arg(completed_at)
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }
}
