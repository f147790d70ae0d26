//! Process sandboxing primitives
//!
//! This module holds the pieces a single execution is assembled from:
//! a scratch workspace, the interpreter argv, the rlimit hook run in the
//! child before exec, the wall clock supervisor and the metrics probe.
//!
//! None of this provides namespace, network or filesystem isolation. The
//! child runs as the same user as the supervisor, bounded only by rlimits
//! and the wall clock.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::sandbox::command::InterpreterCommand;
pub use crate::sandbox::limits::{Limit, ResourceLimiter};
pub use crate::sandbox::metrics::{Metrics, MetricsProbe};
pub use crate::sandbox::supervisor::{
    CompletedRun, KILL_GRACE, Outcome, Supervisor, TRUNCATION_MARKER,
};
pub use crate::sandbox::workspace::Workspace;

mod command;
mod limits;
mod metrics;
mod supervisor;
mod workspace;

/// Errors that occur while preparing or supervising a process
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create workspace under {root}: {source}")]
    WorkspaceCreate {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("empty command")]
    EmptyCommand,

    #[error("failed to launch {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for process: {0}")]
    WaitFailed(#[source] std::io::Error),
}
