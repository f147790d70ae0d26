//! A library for running short Python and JavaScript snippets.
//!
//! Sandrun launches the host interpreter on a snippet inside a throwaway
//! workspace, bounds it with rlimits and a wall clock deadline, and reports
//! a structured [`ExecutionResult`] whatever happens to the program.
//!
//! # Features
//!
//! - **Scratch workspaces**: a fresh directory per execution, always removed.
//! - **Resource limits**: CPU time, address space, and a zero file size cap.
//! - **Wall clock supervision**: runaway programs are killed at the deadline.
//! - **Result classification**: stderr split into errors and warnings.
//! - **TOML configuration**: default limits and per-language overrides.
//!
//! Sandrun is not an isolation boundary. Snippets run as the calling user
//! with network and filesystem access.
//!
//! ```no_run
//! # async fn demo() {
//! use sandrun::{ExecutionConfig, execute};
//!
//! let result = execute("python", "print(1 + 1)", &ExecutionConfig::default()).await;
//! assert_eq!(result.output, "2");
//!
//! // node needs far more address space than python
//! let config = ExecutionConfig::default().with_memory_limit(8192);
//! let result = execute("javascript", "console.log('ok')", &config).await;
//! assert_eq!(result.output, "ok");
//! # }
//! ```

pub use config::{
    Config, ConfigError, EXAMPLE_CONFIG, LanguageConfig, LanguageId, UnknownLanguage,
};
pub use runner::{ExecuteError, Runner, execute};
pub use sandbox::{SandboxError, Workspace};
pub use types::{ExecutionConfig, ExecutionResult, ExecutionStatus, LimitOverrides};

pub mod config;
pub mod runner;
pub mod sandbox;
pub mod types;
