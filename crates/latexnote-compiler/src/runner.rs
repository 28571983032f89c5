//! Process invocation seam.
//!
//! Every external program the compiler touches (version probes, Tectonic,
//! pdflatex) goes through the [`CommandRunner`] trait so the orchestration can
//! be exercised without a TeX distribution installed:
//!
//! - **Production**: [`TokioCommandRunner`] spawns real processes on `tokio::process`
//! - **Testing**: `mock::ScriptedRunner` replays scripted results and records calls
//!
//! A wall-clock timeout is part of every [`Invocation`]. Hitting it is not an
//! error: the child is killed and the run reports [`ExitState::TimedOut`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Number of trailing stdout lines kept when stderr has nothing to say.
const STDOUT_TAIL_LINES: usize = 20;

/// How long output is still collected after the child has exited.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// One external process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run, either a bare name or a resolved path.
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory for the child; inherits ours when `None`.
    pub working_dir: Option<PathBuf>,
    /// Hard wall-clock limit enforced by the runner, not by the tool.
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            timeout,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Arguments as displayable strings, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The process exited on its own. `None` means it was killed by a signal.
    Exited(Option<i32>),
    /// The runner killed the process after the given limit.
    TimedOut(Duration),
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Exited(Some(code)) => write!(f, "exit status {}", code),
            ExitState::Exited(None) => write!(f, "terminated by signal"),
            ExitState::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// Captured result of a finished (or killed) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub exit: ExitState,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit: ExitState::Exited(Some(code)),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out(limit: Duration) -> Self {
        Self {
            exit: ExitState::TimedOut(limit),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Exit code 0 is success regardless of what was written to stderr.
    pub fn success(&self) -> bool {
        self.exit == ExitState::Exited(Some(0))
    }

    /// Text recorded for a failed attempt.
    pub fn diagnostic(&self) -> String {
        match self.exit {
            ExitState::TimedOut(limit) => {
                format!("compilation timed out after {} seconds", limit.as_secs())
            }
            ExitState::Exited(code) => {
                let stderr = self.stderr.trim();
                if !stderr.is_empty() {
                    return stderr.to_string();
                }
                let tail = stdout_tail(&self.stdout, STDOUT_TAIL_LINES);
                if !tail.is_empty() {
                    return tail;
                }
                match code {
                    Some(code) => format!("exited with status {}", code),
                    None => "terminated by signal".to_string(),
                }
            }
        }
    }
}

fn stdout_tail(stdout: &str, lines: usize) -> String {
    let kept: Vec<&str> = stdout
        .trim_end()
        .lines()
        .rev()
        .take(lines)
        .collect();
    kept.into_iter().rev().collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Trait for executing external programs.
///
/// Implementations must be `Send + Sync`: one runner is shared by every
/// concurrent compilation request.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Runs the invocation to completion or until its timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be started or waited
    /// on (e.g. executable missing, permission denied). A non-zero exit or a
    /// timeout is reported through [`RunOutput::exit`].
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput>;
}

/// Default implementation of [`CommandRunner`] using `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        // Own process group, so helpers the engine forks can be killed with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {}", invocation.program.display()))?;
        let pgid = child.id();
        let stdout = child.stdout.take().context("failed to open stdout")?;
        let stderr = child.stderr.take().context("failed to open stderr")?;

        // Drain both pipes concurrently with waiting, so a chatty child never
        // blocks on a full pipe buffer.
        let stdout_task = tokio::spawn(read_stream(stdout));
        let stderr_task = tokio::spawn(read_stream(stderr));

        match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => {
                let status = status.with_context(|| {
                    format!("failed to wait for {}", invocation.program.display())
                })?;
                // Background children may still hold the pipes open.
                kill_process_group(pgid);
                Ok(RunOutput {
                    exit: ExitState::Exited(status.code()),
                    stdout: finish_stream(stdout_task).await,
                    stderr: finish_stream(stderr_task).await,
                })
            }
            Err(_) => {
                warn!(
                    "{} exceeded {:?}, killing it",
                    invocation.program.display(),
                    invocation.timeout
                );
                kill_process_group(pgid);
                if let Err(e) = child.kill().await {
                    warn!("failed to kill {}: {}", invocation.program.display(), e);
                }
                stdout_task.abort();
                stderr_task.abort();
                Ok(RunOutput::timed_out(invocation.timeout))
            }
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("stopped reading child output: {}", e);
    }
    buf
}

/// Collects a reader task, giving up after [`PIPE_GRACE`] once the child is gone.
async fn finish_stream(mut task: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(PIPE_GRACE, &mut task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(e)) => {
            debug!("output reader failed: {}", e);
            String::new()
        }
        Err(_) => {
            task.abort();
            warn!("child output still open {:?} after exit, dropping it", PIPE_GRACE);
            String::new()
        }
    }
}

/// SIGKILLs every process left in the engine's process group.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}
