//! Code runner for sandrun
//!
//! Provides the high-level API: resolve limits for a language, run the
//! source in a fresh workspace and fold every failure into an
//! [`ExecutionResult`].

use thiserror::Error;
use tracing::{debug, warn};

pub use crate::runner::classify::{
    Classification, Termination, classify, signal_reason, split_stderr,
};

mod classify;
mod execution;

use crate::{
    config::{Config, LanguageId, UnknownLanguage},
    sandbox::SandboxError,
    types::{ExecutionConfig, ExecutionResult, LimitOverrides},
};

/// Errors that stop an execution before a result can be classified
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnknownLanguage),

    #[error("Invalid limit: {name} must be positive")]
    InvalidLimit { name: &'static str },

    #[error("Source exceeds maximum length of {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("Execution failed: {0}")]
    Launch(#[source] SandboxError),

    #[error("Execution failed: {0}")]
    Internal(#[from] SandboxError),
}

impl From<ExecuteError> for ExecutionResult {
    fn from(err: ExecuteError) -> Self {
        ExecutionResult::failure(err.to_string())
    }
}

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Limits for a language: defaults, then language limits, then `overrides`
    pub fn limits_for(
        &self,
        language: LanguageId,
        overrides: Option<&LimitOverrides>,
    ) -> ExecutionConfig {
        let limits = self.config.language_limits(language);
        match overrides {
            Some(overrides) => limits.with_overrides(overrides),
            None => limits,
        }
    }

    /// Run `source` with limits resolved from the config
    ///
    /// Never fails: rejected requests and launch failures come back as
    /// results with status `error`.
    pub async fn execute(
        &self,
        language: &str,
        source: &str,
        overrides: Option<&LimitOverrides>,
    ) -> ExecutionResult {
        fold(self.try_execute(language, source, overrides).await)
    }

    /// Run `source` with exactly `limits`, ignoring configured limits
    pub async fn execute_with(
        &self,
        language: &str,
        source: &str,
        limits: &ExecutionConfig,
    ) -> ExecutionResult {
        fold(self.try_execute_with(language, source, limits).await)
    }

    /// Like [`execute`](Self::execute), keeping pre-run failures as errors
    pub async fn try_execute(
        &self,
        language: &str,
        source: &str,
        overrides: Option<&LimitOverrides>,
    ) -> Result<ExecutionResult, ExecuteError> {
        let language: LanguageId = language.parse()?;
        let limits = self.limits_for(language, overrides);
        execution::execute(&self.config, language, source, &limits).await
    }

    /// Like [`execute_with`](Self::execute_with), keeping pre-run failures as errors
    pub async fn try_execute_with(
        &self,
        language: &str,
        source: &str,
        limits: &ExecutionConfig,
    ) -> Result<ExecutionResult, ExecuteError> {
        let language: LanguageId = language.parse()?;
        execution::execute(&self.config, language, source, limits).await
    }
}

/// Run `source` as `language` under exactly `config`
///
/// Uses `python3` and `node` from `PATH` and the system temp directory.
/// No per-language limits are layered in: `node` reserves several GB of
/// address space at startup and will not run under the default 128 MB
/// `memory_limit_mb`. Raise it for javascript, or use
/// `Runner::with_defaults().execute(..)`, which applies the per-language
/// limits of the embedded config.
pub async fn execute(language: &str, source: &str, config: &ExecutionConfig) -> ExecutionResult {
    Runner::new(Config::empty())
        .execute_with(language, source, config)
        .await
}

fn fold(result: Result<ExecutionResult, ExecuteError>) -> ExecutionResult {
    match result {
        Ok(result) => result,
        Err(err) => {
            match &err {
                ExecuteError::UnsupportedLanguage(_)
                | ExecuteError::InvalidLimit { .. }
                | ExecuteError::SourceTooLarge { .. } => {
                    debug!(error = %err, "request rejected")
                }
                ExecuteError::Launch(_) | ExecuteError::Internal(_) => {
                    warn!(error = %err, "execution failed before the program ran")
                }
            }
            err.into()
        }
    }
}
