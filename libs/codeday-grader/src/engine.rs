//! Execution Engine - Sandboxed Executor
//!
//! **Core Responsibility:**
//! Run untrusted source code once, with a fixed stdin, and capture raw stdout.
//!
//! **Critical Architectural Boundary:**
//! - Engine knows HOW to execute (scratch file, interpreter, pipes, timeout)
//! - Engine does NOT know expected outputs
//! - Engine returns raw output plus a failure reason for the Evaluator
//!
//! **Execution Rules:**
//! 1. Code is written to a fresh scratch directory per call, removed on every exit path
//! 2. The interpreter is spawned directly (argv, no shell) in its own process group
//! 3. stdin receives the sample input plus a line terminator, then EOF
//! 4. A hard wall-clock timeout covers the whole run, including draining output
//! 5. The process group is SIGKILLed as soon as the leader exits, so no descendant
//!    survives and leftover background jobs cannot hold the output pipes open
//!
//! There is no memory, CPU, filesystem or network confinement. The timeout is
//! the only resource bound.

use crate::error::ExecutionFailure;
use codeday_common::config::Interpreter;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Safety limits to keep pathological submissions away from the interpreter
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_STDIN_BYTES: usize = 10 * 1024 * 1024; // 10MB
pub const MAX_STDOUT_BYTES: usize = 1024 * 1024; // 1MB
const MAX_STDERR_BYTES: usize = 64 * 1024;

const SCRATCH_PREFIX: &str = "codeday-";
const SCRATCH_STEM: &str = "solution";

/// Raw result of one run, produced by the engine and consumed by the evaluator
#[derive(Debug)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
    pub failure: Option<ExecutionFailure>,
}

impl ExecutionOutput {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    fn failure(failure: ExecutionFailure, stderr: String, execution_time_ms: u64) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            execution_time_ms,
            failure: Some(failure),
        }
    }
}

/// Per-call scratch arena. Dropping it removes the directory.
struct Scratch {
    dir: TempDir,
    program: PathBuf,
}

impl Scratch {
    async fn create(parent: Option<&Path>, extension: &str, code: &str) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        let file_name = if extension.is_empty() {
            SCRATCH_STEM.to_string()
        } else {
            format!("{}.{}", SCRATCH_STEM, extension)
        };
        let program = dir.path().join(file_name);
        tokio::fs::write(&program, code).await?;

        Ok(Self { dir, program })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Process group cleanup guard - SIGKILLs the whole group on drop
///
/// Covers the timeout path and cancellation of the `execute` future alike.
struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self {
            pgid: leader.map(|pid| Pid::from_raw(pid as i32)),
        }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!(pgid = %pgid, error = %e, "Failed to kill process group"),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// What a finished process left behind, before classification
struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stdout_truncated: bool,
    stderr: Vec<u8>,
}

/// Drain a pipe to EOF, keeping at most `cap` bytes
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(buf.len());
        if n > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok((buf, truncated))
}

/// Local interpreter engine
///
/// Runs `<command> [args..] <scratch>/solution.<ext>` for every call.
#[derive(Debug, Clone)]
pub struct LocalEngine {
    interpreter: Interpreter,
    scratch_dir: Option<PathBuf>,
}

impl LocalEngine {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            scratch_dir: None,
        }
    }

    /// Create scratch directories under `dir` instead of the system temp dir
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Execute normalized code with `stdin_input` on stdin
    ///
    /// Never errors: every outcome is an `ExecutionOutput`, with `failure`
    /// set whenever no trustworthy stdout was produced.
    #[instrument(skip_all, fields(interpreter = %self.interpreter.command, timeout_ms = timeout.as_millis() as u64))]
    pub async fn execute(&self, code: &str, stdin_input: &str, timeout: Duration) -> ExecutionOutput {
        let start_time = Instant::now();
        let result = self.run(code, stdin_input, timeout).await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        let captured = match result {
            Ok(captured) => captured,
            Err(failure) => {
                debug!(execution_ms = execution_time_ms, reason = %failure, "Run failed");
                return ExecutionOutput::failure(failure, String::new(), execution_time_ms);
            }
        };

        let stderr = String::from_utf8_lossy(&captured.stderr).into_owned();
        match classify(captured) {
            Ok(stdout) => {
                debug!(execution_ms = execution_time_ms, stdout_bytes = stdout.len(), "Run completed");
                ExecutionOutput {
                    stdout,
                    stderr,
                    execution_time_ms,
                    failure: None,
                }
            }
            Err(failure) => {
                debug!(execution_ms = execution_time_ms, reason = %failure, "Run failed");
                ExecutionOutput::failure(failure, stderr, execution_time_ms)
            }
        }
    }

    async fn run(
        &self,
        code: &str,
        stdin_input: &str,
        timeout: Duration,
    ) -> Result<Captured, ExecutionFailure> {
        // GUARDRAIL: reject oversized inputs before touching the filesystem
        if code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(ExecutionFailure::InputTooLarge {
                what: "source code",
                limit: MAX_SOURCE_CODE_BYTES,
            });
        }
        if stdin_input.len() > MAX_STDIN_BYTES {
            return Err(ExecutionFailure::InputTooLarge {
                what: "stdin input",
                limit: MAX_STDIN_BYTES,
            });
        }

        let scratch = Scratch::create(
            self.scratch_dir.as_deref(),
            &self.interpreter.file_extension,
            code,
        )
        .await
        .map_err(ExecutionFailure::Scratch)?;

        let mut cmd = Command::new(&self.interpreter.command);
        cmd.args(&self.interpreter.args)
            .arg(&scratch.program)
            .current_dir(scratch.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ExecutionFailure::Spawn {
            program: self.interpreter.command.clone(),
            source,
        })?;

        // CRITICAL: guard right after spawn so the group dies on every path
        let mut group = ProcessGroup::new(child.id());
        debug!(pid = ?child.id(), scratch = %scratch.path().display(), "Interpreter spawned");

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionFailure::Wait(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionFailure::Wait(std::io::Error::other("stderr not captured")))?;

        let mut payload = String::with_capacity(stdin_input.len() + 1);
        payload.push_str(stdin_input);
        payload.push('\n');

        // Pipes are serviced by their own tasks so a chatty program never
        // blocks on a full buffer while we wait for its exit status
        let feed = tokio::spawn(async move {
            if let Some(mut pipe) = stdin {
                // Programs that exit without reading stdin close the pipe early
                if let Err(e) = pipe.write_all(payload.as_bytes()).await {
                    debug!(error = %e, "stdin closed before input was written");
                }
                // pipe dropped here: EOF
            }
        });
        let stdout_reader = tokio::spawn(read_capped(stdout, MAX_STDOUT_BYTES));
        let stderr_reader = tokio::spawn(read_capped(stderr, MAX_STDERR_BYTES));

        // HARD TIMEOUT: one deadline shared by the wait and the drain
        let deadline = tokio::time::Instant::now() + timeout;
        let timeout_ms = timeout.as_millis() as u64;

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => {
                // Kill the group in the same poll that reaped the leader.
                // Descendants still holding stdout/stderr die here, so the
                // drain below reaches EOF instead of waiting out the timeout.
                // While any member lives the pgid cannot be recycled.
                group.kill();
                status.map_err(ExecutionFailure::Wait)?
            }
            Err(_) => {
                debug!(timeout_ms, "Execution timed out - killing process group");

                group.kill();
                if let Err(e) = child.wait().await {
                    warn!(error = %e, "Failed to reap timed-out interpreter");
                }
                feed.abort();
                stdout_reader.abort();
                stderr_reader.abort();

                return Err(ExecutionFailure::Timeout { timeout_ms });
            }
        };
        feed.abort();
        let readers = [stdout_reader.abort_handle(), stderr_reader.abort_handle()];

        let drained = tokio::time::timeout_at(deadline, async {
            tokio::join!(stdout_reader, stderr_reader)
        })
        .await;
        let (stdout, stderr) = match drained {
            Ok(pipes) => pipes,
            Err(_) => {
                // Only a process that left the group can keep a pipe open
                debug!(timeout_ms, "Output still open after exit");
                readers.iter().for_each(|reader| reader.abort());
                return Err(ExecutionFailure::Timeout { timeout_ms });
            }
        };

        let (stdout, stdout_truncated) = stdout
            .map_err(|e| ExecutionFailure::Wait(std::io::Error::other(e)))?
            .map_err(ExecutionFailure::Wait)?;
        let (stderr, _) = stderr.ok().and_then(Result::ok).unwrap_or_default();

        Ok(Captured {
            status,
            stdout,
            stdout_truncated,
            stderr,
        })
        // scratch dropped here: directory removed
    }
}

/// Turn a finished process into stdout text or a failure reason
fn classify(captured: Captured) -> Result<String, ExecutionFailure> {
    if !captured.status.success() {
        return Err(match (captured.status.code(), captured.status.signal()) {
            (Some(code), _) => ExecutionFailure::NonZeroExit { code },
            (None, Some(signal)) => ExecutionFailure::Signalled { signal },
            (None, None) => ExecutionFailure::NonZeroExit { code: -1 },
        });
    }

    if captured.stdout_truncated {
        return Err(ExecutionFailure::OutputTooLarge {
            limit: MAX_STDOUT_BYTES,
        });
    }

    let stdout = String::from_utf8(captured.stdout)?;
    if stdout.is_empty() {
        return Err(ExecutionFailure::NoOutput);
    }

    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(raw_status: i32, stdout: &[u8]) -> Captured {
        Captured {
            status: ExitStatus::from_raw(raw_status),
            stdout: stdout.to_vec(),
            stdout_truncated: false,
            stderr: Vec::new(),
        }
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(classify(captured(0, b"5\n")).unwrap(), "5\n");
    }

    #[test]
    fn test_classify_non_zero_exit() {
        // Wait status encodes the exit code in the high byte
        let result = classify(captured(1 << 8, b"partial"));
        assert!(matches!(result, Err(ExecutionFailure::NonZeroExit { code: 1 })));
    }

    #[test]
    fn test_classify_signal() {
        let result = classify(captured(9, b""));
        assert!(matches!(result, Err(ExecutionFailure::Signalled { signal: 9 })));
    }

    #[test]
    fn test_classify_empty_stdout() {
        assert!(matches!(classify(captured(0, b"")), Err(ExecutionFailure::NoOutput)));
    }

    #[test]
    fn test_classify_whitespace_only_is_output() {
        assert_eq!(classify(captured(0, b"  \n")).unwrap(), "  \n");
    }

    #[test]
    fn test_classify_invalid_utf8() {
        let result = classify(captured(0, &[0xff, 0xfe, b'\n']));
        assert!(matches!(result, Err(ExecutionFailure::Decode(_))));
    }

    #[test]
    fn test_classify_truncated() {
        let mut c = captured(0, b"xxxx");
        c.stdout_truncated = true;
        assert!(matches!(classify(c), Err(ExecutionFailure::OutputTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_read_capped_truncates() {
        let data = vec![b'a'; 20_000];
        let (buf, truncated) = read_capped(&data[..], 100).await.unwrap();
        assert_eq!(buf.len(), 100);
        assert!(truncated);

        let (buf, truncated) = read_capped(&b"short"[..], 100).await.unwrap();
        assert_eq!(buf, b"short");
        assert!(!truncated);
    }

    #[tokio::test]
    async fn test_scratch_removed_on_drop() {
        let scratch = Scratch::create(None, "py", "print(1)\n").await.unwrap();
        let dir = scratch.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&scratch.program).unwrap(), "print(1)\n");
        assert!(scratch.program.ends_with("solution.py"));

        drop(scratch);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_scratch_paths_unique() {
        let a = Scratch::create(None, "py", "").await.unwrap();
        let b = Scratch::create(None, "py", "").await.unwrap();
        assert_ne!(a.program, b.program);
    }

    #[tokio::test]
    async fn test_oversized_source_rejected() {
        let engine = LocalEngine::new(Interpreter::default());
        let code = "#".repeat(MAX_SOURCE_CODE_BYTES + 1);

        let output = engine.execute(&code, "", Duration::from_millis(100)).await;
        assert!(matches!(
            output.failure,
            Some(ExecutionFailure::InputTooLarge { what: "source code", .. })
        ));
    }
}
