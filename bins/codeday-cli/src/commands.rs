//! CLI commands: thin callers of the challenge store and the grader

use anyhow::{bail, Context, Result};
use codeday_common::store::ChallengeStore;
use codeday_common::types::{Challenge, Stats, Submission, Verdict};
use codeday_grader::{submit as grade_submission, GradeError, Grader};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Same message for wrong answers, crashes and timeouts
const RETRY_MESSAGE: &str = "Wrong result. Try again!";

fn status_mark(challenge: &Challenge) -> &'static str {
    if challenge.completed {
        "[x]"
    } else {
        "[ ]"
    }
}

fn list_line(challenge: &Challenge) -> String {
    let mut line = format!(
        "Day {:>2} {} {}",
        challenge.day,
        status_mark(challenge),
        challenge.title
    );
    if let Some(name) = &challenge.user_name {
        line.push_str(&format!(" (solved by {})", name));
    }
    line
}

/// List all challenges ordered by day
pub async fn list(store: &dyn ChallengeStore) -> Result<()> {
    let challenges = store.list().await.context("Failed to list challenges")?;
    for challenge in &challenges {
        println!("{}", list_line(challenge));
    }
    Ok(())
}

/// Show one challenge with its sample input and expected output
pub async fn show(store: &dyn ChallengeStore, day: u32) -> Result<()> {
    let challenge = match store.get(day).await.context("Failed to load challenge")? {
        Some(c) => c,
        None => bail!("Challenge not found: day {}", day),
    };

    println!("Day {}: {}", challenge.day, challenge.title);
    println!();
    println!("{}", challenge.description);
    println!();
    println!("Sample input:    {}", challenge.sample_input);
    println!("Expected output: {}", challenge.expected_output);
    if let Some(name) = &challenge.user_name {
        println!("Solved by:       {}", name);
    }
    Ok(())
}

/// Read the submission from a file, or stdin when no file is given
pub async fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read source from stdin")?;
            Ok(code)
        }
    }
}

/// Grade a submission and print the outcome
pub async fn submit(
    grader: &Grader,
    store: &dyn ChallengeStore,
    day: u32,
    name: &str,
    code: &str,
) -> Result<Verdict> {
    let submission = Submission::new(day, name, code);

    let report = match grade_submission(grader, store, &submission).await {
        Ok(report) => report,
        Err(GradeError::ChallengeNotFound(day)) => bail!("Challenge not found: day {}", day),
        Err(e) => return Err(e).context("Failed to grade submission"),
    };

    if report.verdict().is_pass() {
        println!("Correct! Day {} completed by {}.", report.day, report.learner_name);
    } else {
        println!("{}", RETRY_MESSAGE);
        println!();
        println!("Your code:");
        println!("{}", report.submitted_code);
    }

    Ok(report.verdict())
}

fn stats_lines(challenges: &[Challenge]) -> Vec<String> {
    let stats = Stats::from_challenges(challenges);
    let mut lines = vec![format!(
        "Days completed: {} / {}",
        stats.days_completed, stats.total
    )];
    for challenge in challenges.iter().filter(|c| c.completed) {
        lines.push(format!(
            "  Day {:>2}: {}",
            challenge.day,
            challenge.user_name.as_deref().unwrap_or("-")
        ));
    }
    lines
}

/// Print how many days are completed and who solved them
pub async fn stats(store: &dyn ChallengeStore) -> Result<()> {
    let challenges = store.list().await.context("Failed to list challenges")?;
    for line in stats_lines(&challenges) {
        println!("{}", line);
    }
    Ok(())
}
