use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single graded exercise, keyed by its `day`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub day: u32,
    pub title: String,
    pub description: String,
    /// Fed verbatim (plus a line terminator) to the program's stdin
    pub sample_input: String,
    /// Compared against the trimmed program output
    pub expected_output: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn new(
        day: u32,
        title: &str,
        description: &str,
        sample_input: &str,
        expected_output: &str,
    ) -> Self {
        Self {
            day,
            title: title.to_string(),
            description: description.to_string(),
            sample_input: sample_input.to_string(),
            expected_output: expected_output.to_string(),
            completed: false,
            user_name: None,
            completed_at: None,
        }
    }
}

/// One learner attempt at a challenge. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub challenge_day: u32,
    pub learner_name: String,
    pub source_code: String,
}

impl Submission {
    pub fn new(challenge_day: u32, learner_name: &str, source_code: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            challenge_day,
            learner_name: learner_name.to_string(),
            source_code: source_code.to_string(),
        }
    }
}

/// Grading outcome
///
/// `Fail` means the program ran and printed the wrong thing;
/// `ExecutionError` means no comparable output was produced at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    ExecutionError,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
            Verdict::ExecutionError => write!(f, "execution_error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub verdict: Verdict,
    pub raw_output: String,
    /// Operator-facing failure reason; never shown to the learner
    pub error_detail: Option<String>,
}

/// Completion summary over the whole challenge set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub days_completed: usize,
}

impl Stats {
    pub fn from_challenges(challenges: &[Challenge]) -> Self {
        Self {
            total: challenges.len(),
            days_completed: challenges.iter().filter(|c| c.completed).count(),
        }
    }
}
