//! Outcome classification for completed runs
//!
//! Turns an exit status and captured stderr into the error/warning lists,
//! exit code and final status of an [`ExecutionResult`](crate::ExecutionResult).

use std::process::ExitStatus;

use crate::types::ExecutionStatus;

/// How a completed process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
    /// Neither an exit code nor a signal is available
    Abnormal,
}

impl Termination {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal);
            }
        }
        Termination::Abnormal
    }

    /// Exit code reported in the result (`-signal` for signal deaths)
    pub fn exit_code(&self) -> i32 {
        match *self {
            Termination::Exited(code) => code,
            Termination::Signaled(signal) => -signal,
            Termination::Abnormal => 1,
        }
    }

    /// Reason to report when stderr says nothing, `None` for a clean exit
    pub fn failure_reason(&self) -> Option<String> {
        match *self {
            Termination::Exited(0) => None,
            Termination::Exited(code) => Some(format!("Process exited with code {code}")),
            Termination::Signaled(signal) => Some(signal_reason(signal)),
            Termination::Abnormal => Some(ABNORMAL_REASON.to_owned()),
        }
    }
}

const ABNORMAL_REASON: &str = "Process terminated abnormally";

/// Human-readable reason for a terminating signal
#[cfg(unix)]
pub fn signal_reason(signal: i32) -> String {
    let reason = match signal {
        libc::SIGXCPU => "CPU time limit exceeded",
        libc::SIGKILL => "Process killed (possible memory limit exceeded or timeout)",
        libc::SIGTERM => "Process terminated",
        libc::SIGSEGV => "Segmentation fault",
        libc::SIGALRM => "Time limit exceeded",
        other => return format!("Process terminated by signal {other}"),
    };
    reason.to_owned()
}

#[cfg(not(unix))]
pub fn signal_reason(_signal: i32) -> String {
    ABNORMAL_REASON.to_owned()
}

/// Split stderr into `(errors, warnings)`, both in original order
///
/// A line is a warning when its lowercase form contains "warning"; every
/// other non-blank line is an error.
pub fn split_stderr(stderr: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in stderr.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.to_lowercase().contains("warning") {
            warnings.push(line.to_owned());
        } else {
            errors.push(line.to_owned());
        }
    }

    (errors, warnings)
}

/// Classified view of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub status: ExecutionStatus,
    pub exit_code: i32,
}

/// Classify a completed run from how it ended and what it wrote to stderr
pub fn classify(termination: Termination, stderr: &str) -> Classification {
    let (mut errors, warnings) = split_stderr(stderr);

    if errors.is_empty()
        && let Some(reason) = termination.failure_reason()
    {
        errors.push(reason);
    }

    let exit_code = termination.exit_code();
    let status = if exit_code == 0 && errors.is_empty() {
        ExecutionStatus::Success
    } else {
        ExecutionStatus::Error
    };

    Classification {
        errors,
        warnings,
        status,
        exit_code,
    }
}
