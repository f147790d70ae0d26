use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{LanguageConfig, LanguageId, UnknownLanguage};
use crate::types::ExecutionConfig;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../sandrun.example.toml");

/// Environment variable overriding `defaults.timeout_seconds`
pub const ENV_TIMEOUT: &str = "SANDBOX_TIMEOUT";
/// Environment variable overriding `defaults.memory_limit_mb`
pub const ENV_MEMORY: &str = "MAX_MEMORY";
/// Environment variable overriding `defaults.cpu_time_limit_seconds`
pub const ENV_CPU_TIME: &str = "SANDBOX_CPU_TIME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' is not supported")]
    UnknownLanguage(String),

    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for sandrun
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Limits applied to every execution unless overridden
    #[serde(default)]
    pub defaults: ExecutionConfig,

    /// Largest accepted source text in bytes
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Per-stream capture cap in bytes; the rest is drained and dropped
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Where per-execution scratch directories are created
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Language settings keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,
}

/// Scratch directory settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory (system temp dir if unset)
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Prefix for the randomly named directory
    #[serde(default = "default_workspace_prefix")]
    pub prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: default_workspace_prefix(),
        }
    }
}

impl Config {
    /// Create a new config from the embedded example
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with built-in defaults and no language entries
    pub fn empty() -> Self {
        Self {
            defaults: ExecutionConfig::default(),
            max_source_bytes: default_max_source_bytes(),
            max_output_bytes: default_max_output_bytes(),
            workspace: WorkspaceConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Settings for a language (defaults if the config has no entry)
    pub fn language(&self, id: LanguageId) -> LanguageConfig {
        self.languages.get(id.as_str()).cloned().unwrap_or_default()
    }

    /// Interpreter binary for a language
    pub fn interpreter(&self, id: LanguageId) -> PathBuf {
        self.language(id).interpreter_for(id)
    }

    /// Resolve limits for a language: defaults, then language limits
    pub fn language_limits(&self, id: LanguageId) -> ExecutionConfig {
        match self.language(id).limits {
            Some(ref limits) => self.defaults.with_overrides(limits),
            None => self.defaults,
        }
    }

    /// Apply `SANDBOX_TIMEOUT`, `MAX_MEMORY` and `SANDBOX_CPU_TIME` from the
    /// process environment to `defaults`
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with a custom lookup
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = env_seconds(&lookup, ENV_TIMEOUT)? {
            self.defaults.timeout_seconds = value;
        }
        if let Some(value) = env_seconds(&lookup, ENV_MEMORY)? {
            self.defaults.memory_limit_mb = value;
        }
        if let Some(value) = env_seconds(&lookup, ENV_CPU_TIME)? {
            self.defaults.cpu_time_limit_seconds = Some(value);
        }
        self.validate()?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn env_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidEnv { name, value: raw }),
    }
}

fn default_max_source_bytes() -> usize {
    200_000
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_workspace_prefix() -> String {
    "sandbox_".to_owned()
}
