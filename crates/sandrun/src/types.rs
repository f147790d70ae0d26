use serde::{Deserialize, Serialize};

/// Limits applied to a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Wall clock bound in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Address space limit in megabytes
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// CPU time limit in seconds (falls back to `timeout_seconds`)
    #[serde(default)]
    pub cpu_time_limit_seconds: Option<u64>,
}

impl ExecutionConfig {
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;
    pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 128;

    pub fn new(timeout_seconds: u64, memory_limit_mb: u64) -> Self {
        Self {
            timeout_seconds,
            memory_limit_mb,
            cpu_time_limit_seconds: None,
        }
    }

    /// Set the wall clock bound in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the address space limit in megabytes
    pub fn with_memory_limit(mut self, mb: u64) -> Self {
        self.memory_limit_mb = mb;
        self
    }

    /// Set an explicit CPU time limit in seconds
    pub fn with_cpu_time_limit(mut self, seconds: u64) -> Self {
        self.cpu_time_limit_seconds = Some(seconds);
        self
    }

    /// CPU time limit actually handed to the child
    pub fn cpu_time_limit(&self) -> u64 {
        self.cpu_time_limit_seconds.unwrap_or(self.timeout_seconds)
    }

    /// Name of the first limit set to zero, if any
    pub fn zero_limit(&self) -> Option<&'static str> {
        if self.timeout_seconds == 0 {
            Some("timeout_seconds")
        } else if self.memory_limit_mb == 0 {
            Some("memory_limit_mb")
        } else if self.cpu_time_limit_seconds == Some(0) {
            Some("cpu_time_limit_seconds")
        } else {
            None
        }
    }

    /// Apply overrides, preferring values from `overrides` when present
    pub fn with_overrides(&self, overrides: &LimitOverrides) -> ExecutionConfig {
        ExecutionConfig {
            timeout_seconds: overrides.timeout_seconds.unwrap_or(self.timeout_seconds),
            memory_limit_mb: overrides.memory_limit_mb.unwrap_or(self.memory_limit_mb),
            cpu_time_limit_seconds: overrides
                .cpu_time_limit_seconds
                .or(self.cpu_time_limit_seconds),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new(default_timeout_seconds(), default_memory_limit_mb())
    }
}

fn default_timeout_seconds() -> u64 {
    ExecutionConfig::DEFAULT_TIMEOUT_SECONDS
}

fn default_memory_limit_mb() -> u64 {
    ExecutionConfig::DEFAULT_MEMORY_LIMIT_MB
}

/// Partial limits layered over an [`ExecutionConfig`]
///
/// Unset fields keep the value of whatever they are layered over, so a
/// language entry that only raises the memory limit still inherits the
/// configured timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverrides {
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub memory_limit_mb: Option<u64>,

    #[serde(default)]
    pub cpu_time_limit_seconds: Option<u64>,
}

impl LimitOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_memory_limit(mut self, mb: u64) -> Self {
        self.memory_limit_mb = Some(mb);
        self
    }

    pub fn with_cpu_time_limit(mut self, seconds: u64) -> Self {
        self.cpu_time_limit_seconds = Some(seconds);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.timeout_seconds.is_none()
            && self.memory_limit_mb.is_none()
            && self.cpu_time_limit_seconds.is_none()
    }
}

/// Final classification of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Exited with code 0 and nothing classified as an error on stderr
    Success,

    /// Any other completion, including launch failures and rejected requests
    Error,

    /// Killed after exceeding the wall clock bound
    Timeout,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Result of an execution
///
/// Exactly one of these is produced per request, whatever happened to the
/// program.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Captured stdout with trailing whitespace trimmed
    pub output: String,

    /// Stderr lines classified as errors, in order
    pub errors: Vec<String>,

    /// Stderr lines mentioning "warning", in order
    pub warnings: Vec<String>,

    /// Wall clock duration in milliseconds
    pub execution_time_ms: f64,

    /// Approximate memory delta in megabytes, never negative
    pub memory_used_mb: f64,

    /// User + system CPU time of the reaped child in seconds
    pub cpu_time_seconds: f64,

    pub status: ExecutionStatus,

    /// Process exit code, `-signal` for signal deaths, `-1` for timeouts
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Build an error result that never reached a running process
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            status: ExecutionStatus::Error,
            exit_code: 1,
            ..Default::default()
        }
    }

    /// Build the result for a run killed at the wall clock bound
    pub fn timed_out(timeout_seconds: u64) -> Self {
        Self {
            errors: vec![format!("Code execution timed out after {timeout_seconds}s")],
            execution_time_ms: (timeout_seconds * 1000) as f64,
            status: ExecutionStatus::Timeout,
            exit_code: -1,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status == ExecutionStatus::Timeout
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self {
            output: String::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            execution_time_ms: 0.0,
            memory_used_mb: 0.0,
            cpu_time_seconds: 0.0,
            status: ExecutionStatus::Error,
            exit_code: 1,
        }
    }
}
