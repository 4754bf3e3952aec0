use codeday_common::store::StoreError;
use std::path::PathBuf;

/// Why a run produced no comparable output
///
/// Every variant collapses to `Verdict::ExecutionError` for the learner;
/// the variant itself is only logged and kept as operator detail.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("{what} exceeds maximum size of {limit} bytes")]
    InputTooLarge { what: &'static str, limit: usize },

    #[error("failed to prepare scratch file: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to spawn interpreter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("process exited with code {code}")]
    NonZeroExit { code: i32 },

    #[error("process killed by signal {signal}")]
    Signalled { signal: i32 },

    #[error("failed to collect process result: {0}")]
    Wait(#[source] std::io::Error),

    #[error("stdout exceeds capture limit of {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("stdout is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("process wrote nothing to stdout")]
    NoOutput,
}

impl ExecutionFailure {
    /// Short stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionFailure::InputTooLarge { .. } => "input_too_large",
            ExecutionFailure::Scratch(_) => "scratch",
            ExecutionFailure::Spawn { .. } => "spawn",
            ExecutionFailure::Timeout { .. } => "timeout",
            ExecutionFailure::NonZeroExit { .. } => "non_zero_exit",
            ExecutionFailure::Signalled { .. } => "signalled",
            ExecutionFailure::Wait(_) => "wait",
            ExecutionFailure::OutputTooLarge { .. } => "output_too_large",
            ExecutionFailure::Decode(_) => "decode",
            ExecutionFailure::NoOutput => "no_output",
        }
    }
}

/// Errors around grading, never from it
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("no challenge for day {0}")]
    ChallengeNotFound(u32),

    #[error("challenge store failed: {0}")]
    Store(#[from] StoreError),

    #[error("scratch directory {path} is not usable: {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
