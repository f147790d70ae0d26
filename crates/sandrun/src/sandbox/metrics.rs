//! Timing, memory and CPU measurements around a single run
//!
//! `memory_used_mb` is the change in the *supervisor's* resident set size
//! across the run, clamped at zero. It approximates the run's footprint on
//! the host and is not the child's peak usage.
//!
//! `cpu_time_seconds` is the change in `RUSAGE_CHILDREN` across the run, so
//! it covers every child reaped by this process in that window. Concurrent
//! runs in one process can see each other's CPU time.

use std::time::Instant;

/// Snapshot taken immediately before launch
#[derive(Debug, Clone, Copy)]
pub struct MetricsProbe {
    started: Instant,
    rss_mb: f64,
    children_cpu_seconds: f64,
}

/// Measurements for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub execution_time_ms: f64,
    pub memory_used_mb: f64,
    pub cpu_time_seconds: f64,
}

impl MetricsProbe {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            rss_mb: resident_mb(),
            children_cpu_seconds: children_cpu_seconds(),
        }
    }

    /// Take the closing measurements
    pub fn finish(&self) -> Metrics {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let memory = (resident_mb() - self.rss_mb).max(0.0);
        let cpu = (children_cpu_seconds() - self.children_cpu_seconds).max(0.0);

        Metrics {
            execution_time_ms: round_to(elapsed_ms, 3),
            memory_used_mb: round_to(memory, 2),
            cpu_time_seconds: round_to(cpu, 3),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Resident set size of this process in MB, 0 when unavailable
#[cfg(target_os = "linux")]
fn resident_mb() -> f64 {
    // statm: size resident shared text lib data dt (in pages)
    let Ok(statm) = std::fs::read_to_string("/proc/self/statm") else {
        return 0.0;
    };
    let Some(pages) = statm
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<u64>().ok())
    else {
        return 0.0;
    };
    // SAFETY: sysconf has no preconditions.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return 0.0;
    }
    (pages * page_size as u64) as f64 / (1024.0 * 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn resident_mb() -> f64 {
    0.0
}

/// User + system CPU seconds of all reaped children
#[cfg(unix)]
fn children_cpu_seconds() -> f64 {
    // SAFETY: zeroed rusage is a valid value; getrusage fills it in.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &mut usage) };
    if rc != 0 {
        return 0.0;
    }
    timeval_seconds(usage.ru_utime) + timeval_seconds(usage.ru_stime)
}

#[cfg(unix)]
fn timeval_seconds(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

#[cfg(not(unix))]
fn children_cpu_seconds() -> f64 {
    0.0
}
