//! Verdict Comparator - Interpreter-Agnostic Judging
//!
//! **Core Responsibility:**
//! Compare raw execution output against a challenge's expected output.
//!
//! **Critical Properties:**
//! - Knows nothing about processes or scratch files
//! - Knows nothing about persistence
//! - Pure function: (execution output, expected output) → verdict
//!
//! **Judging Rules, in order:**
//! 1. Execution failed → `ExecutionError`
//! 2. `stdout.trim() == expected` → `Pass`
//! 3. Otherwise → `Fail`
//!
//! **Normalization:**
//! - Outer whitespace of stdout trimmed: YES (including trailing newline)
//! - Expected output trimmed: NO (compared as written)
//! - Internal whitespace: preserved
//! - Case sensitivity: YES (exact match required)
//! - Numeric coercion / floating-point tolerance: NO

use crate::engine::ExecutionOutput;
use codeday_common::types::{ExecutionResult, Verdict};

/// Normalize program output for comparison
fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Judge one run
pub fn compare(stdout: &str, failed: bool, expected_output: &str) -> Verdict {
    if failed {
        Verdict::ExecutionError
    } else if normalize_output(stdout) == expected_output {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Judge an engine output and package it for the caller
pub fn evaluate(output: &ExecutionOutput, expected_output: &str) -> ExecutionResult {
    let verdict = compare(&output.stdout, output.failed(), expected_output);

    ExecutionResult {
        verdict,
        raw_output: output.stdout.clone(),
        error_detail: output.failure.as_ref().map(|f| f.to_string()),
    }
}
