//! Grading Orchestrator
//!
//! **Responsibility:**
//! Coordinate normalizer, engine and evaluator into a verdict, and record
//! passing verdicts in the challenge store.
//!
//! **Architecture:**
//! 1. Normalize the submitted code (normalizer.rs)
//! 2. Run it against the challenge's sample input (engine.rs)
//! 3. Judge the output against the expected output (evaluator.rs)
//! 4. On `Pass` only, mark the challenge completed by the learner
//!
//! This module is the glue layer - it knows nothing about:
//! - How code executes (engine's job)
//! - How output is judged (evaluator's job)
//! - How challenges are stored (store's job)

use crate::engine::LocalEngine;
use crate::error::GradeError;
use crate::evaluator;
use crate::normalizer::normalize;
use codeday_common::config::Config;
use codeday_common::store::ChallengeStore;
use codeday_common::types::{Challenge, ExecutionResult, Submission, Verdict};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Everything a caller needs to answer the learner
///
/// On failure the submitted code is echoed back for redisplay; which kind
/// of failure happened is only in `result.error_detail`, for operators.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub submission_id: Uuid,
    pub day: u32,
    pub learner_name: String,
    pub result: ExecutionResult,
    pub submitted_code: String,
    pub normalized_code: String,
    pub execution_time_ms: u64,
}

impl GradeReport {
    pub fn verdict(&self) -> Verdict {
        self.result.verdict
    }
}

pub struct Grader {
    engine: LocalEngine,
    timeout: Duration,
}

impl Grader {
    pub fn new(engine: LocalEngine, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// Build from configuration, checking the scratch parent up front
    pub fn from_config(config: &Config) -> Result<Self, GradeError> {
        let mut engine = LocalEngine::new(config.interpreter.clone());

        if let Some(dir) = &config.scratch_dir {
            let metadata = std::fs::metadata(dir).map_err(|source| GradeError::ScratchDir {
                path: dir.clone(),
                source,
            })?;
            if !metadata.is_dir() {
                return Err(GradeError::ScratchDir {
                    path: dir.clone(),
                    source: std::io::Error::other("not a directory"),
                });
            }
            engine = engine.with_scratch_dir(dir.clone());
        }

        Ok(Self::new(engine, Duration::from_millis(config.timeout_ms)))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Grade a submission against a challenge. Always ends in a verdict.
    #[instrument(
        skip(self, challenge, submission),
        fields(submission_id = %submission.id, day = challenge.day, learner = %submission.learner_name)
    )]
    pub async fn grade(&self, challenge: &Challenge, submission: &Submission) -> GradeReport {
        let normalized_code = normalize(&submission.source_code);

        let output = self
            .engine
            .execute(&normalized_code, &challenge.sample_input, self.timeout)
            .await;

        // Cross-layer guard: keep the failure reason for operators
        if let Some(failure) = &output.failure {
            warn!(
                reason = failure.kind(),
                detail = %failure,
                execution_ms = output.execution_time_ms,
                stderr_preview = output.stderr.lines().next().unwrap_or(""),
                "Submission produced no comparable output"
            );
        }

        let result = evaluator::evaluate(&output, &challenge.expected_output);

        info!(
            verdict = %result.verdict,
            execution_ms = output.execution_time_ms,
            "Submission graded"
        );

        GradeReport {
            submission_id: submission.id,
            day: challenge.day,
            learner_name: submission.learner_name.clone(),
            result,
            submitted_code: submission.source_code.clone(),
            normalized_code,
            execution_time_ms: output.execution_time_ms,
        }
    }
}

/// Look up the challenge, grade the submission, and record a pass
///
/// Only a `Pass` writes to the store, as one `mark_completed` call.
#[instrument(skip_all, fields(submission_id = %submission.id, day = submission.challenge_day))]
pub async fn submit(
    grader: &Grader,
    store: &dyn ChallengeStore,
    submission: &Submission,
) -> Result<GradeReport, GradeError> {
    let challenge = store
        .get(submission.challenge_day)
        .await?
        .ok_or(GradeError::ChallengeNotFound(submission.challenge_day))?;

    let report = grader.grade(&challenge, submission).await;

    if report.verdict().is_pass() {
        let recorded = store
            .mark_completed(challenge.day, &submission.learner_name)
            .await?;
        if recorded {
            info!(learner = %submission.learner_name, "Challenge marked completed");
        } else {
            // Challenge set is immutable after seeding; this means the store changed underneath us
            return Err(GradeError::ChallengeNotFound(challenge.day));
        }
    }

    Ok(report)
}
