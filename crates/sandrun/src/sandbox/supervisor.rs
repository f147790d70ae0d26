//! Process spawning and wall clock supervision
//!
//! A run moves through `Launching -> Running -> {Completed, Killed}`. Launch
//! failures are returned as errors and never reach `Running`.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;
use crate::sandbox::limits::ResourceLimiter;

/// How long a killed process gets to be reaped
pub const KILL_GRACE: Duration = Duration::from_millis(200);

/// Appended to a stream that hit the capture cap
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
const READ_CHUNK: usize = 8192;

/// Terminal state of a supervised run
#[derive(Debug)]
pub enum Outcome {
    /// Exited (or died from a signal) within the deadline
    Completed(CompletedRun),
    /// Deadline exceeded; the process was killed
    Killed,
}

/// A process that finished on its own
#[derive(Debug)]
pub struct CompletedRun {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns a process and bounds how long it may run
#[derive(Debug, Clone)]
pub struct Supervisor {
    timeout: Duration,
    grace: Duration,
    max_output_bytes: usize,
}

impl Supervisor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            grace: KILL_GRACE,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Set the wait after a kill (and for pipe readers after exit)
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Set the per-stream capture cap in bytes
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `args` in `cwd` with `limiter` attached
    ///
    /// stdout and stderr are drained by their own tasks while waiting, so a
    /// chatty program can't block on a full pipe.
    #[instrument(skip(self, limiter), fields(timeout = ?self.timeout))]
    pub async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        limiter: &ResourceLimiter,
    ) -> Result<Outcome, SandboxError> {
        let (program, rest) = args.split_first().ok_or(SandboxError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        limiter.attach(&mut command);

        let started = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|source| SandboxError::SpawnFailed {
                program: program.clone(),
                source,
            })?;

        debug!(pid = child.id(), "process running");

        let stdout_task = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, self.max_output_bytes)));
        let stderr_task = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, self.max_output_bytes)));

        match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if self.hit_deadline(status, started.elapsed(), limiter) => {
                debug!(?status, "process killed by its CPU limit at the deadline");
                for task in [stdout_task, stderr_task].into_iter().flatten() {
                    task.abort();
                }
                Ok(Outcome::Killed)
            }
            Ok(Ok(status)) => {
                debug!(?status, "process completed");
                let stdout = self.collect(stdout_task, "stdout").await;
                let stderr = self.collect(stderr_task, "stderr").await;
                Ok(Outcome::Completed(CompletedRun {
                    status,
                    stdout,
                    stderr,
                }))
            }
            Ok(Err(e)) => Err(SandboxError::WaitFailed(e)),
            Err(_) => {
                debug!("deadline exceeded, killing process");
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "failed to kill process");
                }
                match timeout(self.grace, child.wait()).await {
                    Ok(Ok(status)) => debug!(?status, "killed process reaped"),
                    Ok(Err(e)) => warn!(error = %e, "failed to reap killed process"),
                    Err(_) => warn!("killed process not reaped within grace period"),
                }
                for task in [stdout_task, stderr_task].into_iter().flatten() {
                    task.abort();
                }
                Ok(Outcome::Killed)
            }
        }
    }

    /// Whether a process that exited on its own really ran into the deadline
    ///
    /// RLIMIT_CPU (soft = hard) fires SIGKILL or SIGXCPU. When that limit is
    /// not below the wall clock bound it stands in for the deadline, and a
    /// multi-threaded runtime can burn through it before the timer fires.
    /// The same signals arriving once the deadline has passed are a kill
    /// the wait only noticed late.
    #[cfg(unix)]
    fn hit_deadline(
        &self,
        status: ExitStatus,
        elapsed: Duration,
        limiter: &ResourceLimiter,
    ) -> bool {
        use std::os::unix::process::ExitStatusExt;

        let cpu_limit_kill = matches!(status.signal(), Some(libc::SIGKILL | libc::SIGXCPU));
        let cpu_backstop =
            Duration::from_secs(limiter.cpu_time_limit_seconds()) >= self.timeout;
        cpu_limit_kill && (cpu_backstop || elapsed >= self.timeout)
    }

    #[cfg(not(unix))]
    fn hit_deadline(
        &self,
        _status: ExitStatus,
        _elapsed: Duration,
        _limiter: &ResourceLimiter,
    ) -> bool {
        false
    }

    /// Join a pipe reader, giving up after the grace period
    async fn collect(&self, task: Option<JoinHandle<String>>, stream: &str) -> String {
        let Some(mut task) = task else {
            return String::new();
        };
        match timeout(self.grace, &mut task).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(stream, error = %e, "pipe reader failed");
                String::new()
            }
            Err(_) => {
                // Something else (e.g. a grandchild) still holds the pipe open
                warn!(stream, "pipe still open after exit, discarding output");
                task.abort();
                String::new()
            }
        }
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes
///
/// Bytes past the cap are still read so the writer never blocks.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = cap.saturating_sub(buf.len());
                if n > room {
                    truncated = true;
                }
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!(error = %e, "pipe read failed");
                break;
            }
        }
    }

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}
