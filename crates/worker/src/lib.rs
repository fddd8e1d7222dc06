//! Process-based computation units
//!
//! Every external computation in this system (the ranking model, the
//! per-policy trust scorers, the assistant service) runs as a separate
//! OS process. This crate owns the mechanics of talking to those
//! processes so the crates above it only deal in typed outcomes:
//!
//! - [`CommandSpec`] names a unit: the program plus the fixed arguments
//!   that select it (an interpreter and a script path, usually).
//! - [`WorkerInvocation`] is one request against a unit. It is consumed
//!   by [`invoke`], so a single invocation can never be settled twice.
//! - [`WorkerOutcome`] is what came back: a completed run with its exit
//!   code and captured streams, or a timeout.
//! - [`Supervisor`] keeps a long-lived unit alive across crashes.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use worker::{CommandSpec, WorkerInvocation, WorkerOutcome};
//!
//! let invocation = WorkerInvocation::new(
//!     CommandSpec::new("python3").arg("scripts/rank_policies.py"),
//!     Duration::from_secs(60),
//! )
//! .with_input(payload_json);
//!
//! match worker::invoke(invocation).await? {
//!     WorkerOutcome::Completed { exit_code, stdout, .. } => { /* parse stdout */ }
//!     WorkerOutcome::TimedOut => { /* degrade */ }
//! }
//! ```

mod supervisor;

pub use supervisor::Supervisor;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while launching or reaping a computation unit.
///
/// A unit that launches but then fails (non-zero exit, garbage output,
/// timeout) is NOT an error at this layer; that information travels in
/// [`WorkerOutcome`] so callers can apply their own failure policy.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The program could not be started at all (not found, not executable)
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while waiting on an already-running unit
    #[error("worker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

// ============================================================================
// Types
// ============================================================================

/// Names an external computation unit.
///
/// The program plus the arguments that select which unit runs. Per-request
/// arguments do not live here; they belong to the [`WorkerInvocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (e.g. `python3`)
    pub program: String,
    /// Arguments that are part of the unit's identity (e.g. a script path)
    pub base_args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Append a fixed argument (builder style).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.base_args.push(arg.into());
        self
    }

    /// A unit that runs `script` through `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }
}

/// One request to run one computation unit.
///
/// Invocations are ephemeral: [`invoke`] takes the invocation by value,
/// so the type system guarantees each one is settled exactly once.
#[derive(Debug)]
pub struct WorkerInvocation {
    /// The unit to run
    pub command: CommandSpec,
    /// Per-request arguments appended after the unit's base arguments
    pub args: Vec<String>,
    /// Payload written to the unit's stdin (the pipe is closed afterwards)
    pub input: String,
    /// Hard wall-clock limit; the unit is killed when it elapses
    pub timeout: Duration,
    /// Working directory for the unit, if it must differ from ours
    pub working_dir: Option<PathBuf>,
}

impl WorkerInvocation {
    pub fn new(command: CommandSpec, timeout: Duration) -> Self {
        Self {
            command,
            args: Vec::new(),
            input: String::new(),
            timeout,
            working_dir: None,
        }
    }

    /// Append a per-request argument (builder style).
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the stdin payload (builder style).
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the working directory (builder style).
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// What came back from a unit that was successfully launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The unit ran to completion within its time limit
    Completed {
        /// Exit code; `None` when the unit was killed by a signal
        exit_code: Option<i32>,
        /// Captured standard output (lossy UTF-8)
        stdout: String,
        /// Captured standard error (lossy UTF-8)
        stderr: String,
    },
    /// The unit exceeded its time limit and was killed
    TimedOut,
}

impl WorkerOutcome {
    /// True when the unit exited on its own with code 0.
    pub fn is_clean_exit(&self) -> bool {
        matches!(
            self,
            WorkerOutcome::Completed {
                exit_code: Some(0),
                ..
            }
        )
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Run one computation unit to completion or timeout.
///
/// The unit is spawned with piped stdio. The payload is written to its
/// stdin and the pipe is closed, so units that read stdin to EOF see a
/// complete document. Both output streams are drained concurrently while
/// we wait, so a chatty unit cannot deadlock on a full pipe.
///
/// On timeout the unit is killed and reaped before `TimedOut` is
/// returned; no zombie is left behind.
///
/// # Arguments
/// * `invocation` - The request, consumed so it cannot be replayed
///
/// # Returns
/// * `Ok(WorkerOutcome)` - The unit launched; inspect the outcome
/// * `Err(WorkerError)` - The unit never launched, or reaping failed
pub async fn invoke(invocation: WorkerInvocation) -> Result<WorkerOutcome> {
    let WorkerInvocation {
        command,
        args,
        input,
        timeout,
        working_dir,
    } = invocation;

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.base_args)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &working_dir {
        cmd.current_dir(dir);
    }

    debug!(
        program = %command.program,
        args = args.len(),
        timeout_ms = timeout.as_millis() as u64,
        "launching worker"
    );

    let mut child = cmd.spawn().map_err(|source| WorkerError::Launch {
        program: command.program.clone(),
        source,
    })?;

    // Feed the payload on its own task so a unit that never reads stdin
    // cannot stall the timeout clock. Units are allowed to take their
    // payload from argv and exit without draining the pipe, so write
    // errors (EPIPE) are expected and dropped.
    if let Some(mut stdin) = child.stdin.take() {
        tokio::spawn(async move {
            let _ = stdin.write_all(input.as_bytes()).await;
            let _ = stdin.shutdown().await;
        });
    }

    let stdout_task = tokio::spawn(drain(child.stdout.take()));
    let stderr_task = tokio::spawn(drain(child.stderr.take()));

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            debug!(
                program = %command.program,
                exit_code = ?status.code(),
                stdout_bytes = stdout.len(),
                stderr_bytes = stderr.len(),
                "worker completed"
            );
            Ok(WorkerOutcome::Completed {
                exit_code: status.code(),
                stdout,
                stderr,
            })
        }
        Err(_) => {
            warn!(
                program = %command.program,
                timeout_ms = timeout.as_millis() as u64,
                "worker exceeded its time limit, killing"
            );
            let _ = child.start_kill();
            // Reap the killed unit so it does not linger as a zombie.
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            Ok(WorkerOutcome::TimedOut)
        }
    }
}

/// Read a pipe to EOF, tolerating units that produce invalid UTF-8.
async fn drain<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn quick(script: &str) -> WorkerInvocation {
        WorkerInvocation::new(CommandSpec::shell(script), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let outcome = invoke(quick("echo hello")).await.unwrap();
        match outcome {
            WorkerOutcome::Completed {
                exit_code, stdout, ..
            } => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stdout.trim(), "hello");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn captures_nonzero_exit_and_stderr() {
        let outcome = invoke(quick("echo boom >&2; exit 3")).await.unwrap();
        match outcome {
            WorkerOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(stdout.is_empty(), "stdout should be empty");
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stdin_payload_is_written_and_closed() {
        // `cat` only terminates because the stdin pipe is closed after
        // the payload is written.
        let invocation = quick("cat").with_input("payload line");
        let outcome = invoke(invocation).await.unwrap();
        match outcome {
            WorkerOutcome::Completed {
                exit_code, stdout, ..
            } => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stdout, "payload line");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn per_request_args_follow_base_args() {
        let invocation = WorkerInvocation::new(
            CommandSpec::new("sh").arg("-c").arg("echo \"$0 $1\""),
            Duration::from_secs(5),
        )
        .with_arg("first")
        .with_arg("second");
        let outcome = invoke(invocation).await.unwrap();
        match outcome {
            WorkerOutcome::Completed { stdout, .. } => {
                assert_eq!(stdout.trim(), "first second");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_worker_is_killed_at_timeout() {
        let invocation =
            WorkerInvocation::new(CommandSpec::shell("sleep 30"), Duration::from_millis(200));
        let started = Instant::now();
        let outcome = invoke(invocation).await.unwrap();
        assert_eq!(outcome, WorkerOutcome::TimedOut);
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "kill should not wait for the worker's natural exit"
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let invocation = WorkerInvocation::new(
            CommandSpec::new("definitely-not-a-real-program-7f3a"),
            Duration::from_secs(5),
        );
        let err = invoke(invocation).await.unwrap_err();
        match err {
            WorkerError::Launch { program, .. } => {
                assert_eq!(program, "definitely-not-a-real-program-7f3a");
            }
            other => panic!("Expected launch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn working_dir_is_applied() {
        let invocation = quick("pwd").with_working_dir("/");
        let outcome = invoke(invocation).await.unwrap();
        match outcome {
            WorkerOutcome::Completed { stdout, .. } => {
                assert_eq!(stdout.trim(), "/");
            }
            other => panic!("Expected completion, got {:?}", other),
        }
    }

    #[test]
    fn clean_exit_helper() {
        let ok = WorkerOutcome::Completed {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        };
        let failed = WorkerOutcome::Completed {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(ok.is_clean_exit());
        assert!(!failed.is_clean_exit());
        assert!(!WorkerOutcome::TimedOut.is_clean_exit());
    }
}
