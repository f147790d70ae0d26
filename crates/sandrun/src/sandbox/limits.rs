//! Resource limits applied in the child before the interpreter starts

use tokio::process::Command;
use tracing::warn;

use crate::types::ExecutionConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// One of the rlimits set on the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// RLIMIT_CPU, in seconds
    CpuTime,
    /// RLIMIT_AS, in bytes
    AddressSpace,
    /// RLIMIT_FSIZE, in bytes
    FileSize,
}

impl Limit {
    /// Limits in the order they are applied
    pub const ALL: [Limit; 3] = [Limit::CpuTime, Limit::AddressSpace, Limit::FileSize];

    pub fn name(&self) -> &'static str {
        match self {
            Limit::CpuTime => "RLIMIT_CPU",
            Limit::AddressSpace => "RLIMIT_AS",
            Limit::FileSize => "RLIMIT_FSIZE",
        }
    }
}

/// Caps applied to the child between fork and exec
///
/// Soft and hard values are equal, so the program can't raise them again.
/// The three limits are attempted independently: one failing to apply never
/// stops the others or the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimiter {
    cpu_time_limit_seconds: u64,
    memory_limit_mb: u64,
}

impl ResourceLimiter {
    pub fn new(cpu_time_limit_seconds: u64, memory_limit_mb: u64) -> Self {
        Self {
            cpu_time_limit_seconds,
            memory_limit_mb,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config.cpu_time_limit(), config.memory_limit_mb)
    }

    pub fn cpu_time_limit_seconds(&self) -> u64 {
        self.cpu_time_limit_seconds
    }

    /// Value (soft = hard) for a limit
    pub fn value(&self, limit: Limit) -> u64 {
        match limit {
            Limit::CpuTime => self.cpu_time_limit_seconds,
            Limit::AddressSpace => self.memory_limit_mb.saturating_mul(BYTES_PER_MB),
            Limit::FileSize => 0,
        }
    }

    /// Apply every limit to the calling process
    ///
    /// Only calls `setrlimit`, so it is safe between fork and exec. Returns
    /// whether each limit (in [`Limit::ALL`] order) was applied.
    #[cfg(unix)]
    pub fn apply(&self) -> [(Limit, bool); 3] {
        Limit::ALL.map(|limit| (limit, sys::set(limit, self.value(limit))))
    }

    /// Limits the child won't be able to apply
    ///
    /// An unprivileged process can't raise a hard limit, so any value above
    /// the supervisor's own hard limit will be rejected in the child.
    #[cfg(unix)]
    pub fn unenforceable(&self) -> Vec<Limit> {
        Limit::ALL
            .into_iter()
            .filter(|&limit| {
                sys::hard_limit(limit).is_some_and(|hard| self.value(limit) > hard)
            })
            .collect()
    }

    /// Install the limiter as the command's pre-exec hook
    #[cfg(unix)]
    pub fn attach(&self, command: &mut Command) {
        for limit in self.unenforceable() {
            warn!(
                limit = limit.name(),
                value = self.value(limit),
                "limit exceeds the supervisor's hard limit and will not be applied"
            );
        }

        let limiter = *self;

        // SAFETY: the hook runs in the child between fork() and exec(). It
        // only calls setrlimit, which is async-signal-safe, and captures a
        // Copy value, so no allocation or shared state is touched.
        unsafe {
            command.pre_exec(move || {
                // Failures are ignored per limit; see `unenforceable`.
                let _ = limiter.apply();
                Ok(())
            });
        }
    }

    #[cfg(not(unix))]
    pub fn attach(&self, _command: &mut Command) {
        warn!("resource limits are not supported on this platform");
    }
}

#[cfg(unix)]
mod sys {
    use super::Limit;

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    type Resource = libc::__rlimit_resource_t;
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    type Resource = libc::c_int;

    fn resource(limit: Limit) -> Resource {
        match limit {
            Limit::CpuTime => libc::RLIMIT_CPU,
            Limit::AddressSpace => libc::RLIMIT_AS,
            Limit::FileSize => libc::RLIMIT_FSIZE,
        }
    }

    pub(super) fn set(limit: Limit, value: u64) -> bool {
        let rlim = libc::rlimit {
            rlim_cur: value as libc::rlim_t,
            rlim_max: value as libc::rlim_t,
        };
        // SAFETY: setrlimit only reads the struct we pass.
        unsafe { libc::setrlimit(resource(limit), &rlim) == 0 }
    }

    /// Current hard limit, `None` if unlimited or unreadable
    pub(super) fn hard_limit(limit: Limit) -> Option<u64> {
        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: getrlimit writes into the struct we own.
        let rc = unsafe { libc::getrlimit(resource(limit), &mut rlim) };
        if rc != 0 || rlim.rlim_max == libc::RLIM_INFINITY {
            return None;
        }
        Some(rlim.rlim_max as u64)
    }
}
