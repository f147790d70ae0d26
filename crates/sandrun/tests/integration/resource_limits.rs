use std::time::{Duration, Instant};

use sandrun::{ExecutionConfig, ExecutionStatus, LimitOverrides};
use tempfile::TempDir;

use super::{assert_no_workspaces, fixture_source, test_runner};

#[tokio::test]
async fn test_python_timeout() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());
    let overrides = LimitOverrides::new().with_timeout(1);

    let started = Instant::now();
    let result = runner
        .execute("python", &fixture_source("sleep.py"), Some(&overrides))
        .await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert!(result.is_timeout());
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.errors, vec!["Code execution timed out after 1s"]);
    assert_eq!(result.execution_time_ms, 1000.0);
    // Output captured before the kill is discarded
    assert!(result.output.is_empty());
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_no_workspaces(root.path());
}

#[tokio::test]
async fn test_javascript_timeout() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());
    let overrides = LimitOverrides::new().with_timeout(1);

    let started = Instant::now();
    let result = runner
        .execute("javascript", &fixture_source("sleep.js"), Some(&overrides))
        .await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.errors, vec!["Code execution timed out after 1s"]);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_no_workspaces(root.path());
}

#[tokio::test]
async fn test_busy_loop_times_out() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());
    // No explicit CPU limit, so RLIMIT_CPU equals the timeout
    let overrides = LimitOverrides::new().with_timeout(1);

    for (language, name) in [("python", "spin.py"), ("javascript", "spin.js")] {
        for _ in 0..3 {
            let result = runner
                .execute(language, &fixture_source(name), Some(&overrides))
                .await;

            assert_eq!(result.status, ExecutionStatus::Timeout, "{language}: {result:?}");
            assert_eq!(result.exit_code, -1);
            assert_eq!(result.errors, vec!["Code execution timed out after 1s"]);
        }
    }
    assert_no_workspaces(root.path());
}

#[tokio::test]
async fn test_cpu_time_limit() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());
    let limits = ExecutionConfig::new(10, 128).with_cpu_time_limit(1);

    let started = Instant::now();
    let result = runner
        .execute_with("python", &fixture_source("spin.py"), &limits)
        .await;

    // Soft and hard limits are equal, so the kernel may send SIGKILL
    // rather than SIGXCPU when the limit is reached
    assert_eq!(result.status, ExecutionStatus::Error);
    assert!(matches!(result.exit_code, -9 | -24), "{result:?}");
    assert_eq!(result.errors.len(), 1);
    assert!(result.cpu_time_seconds >= 0.9);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_memory_limit() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("allocate.py"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_ne!(result.exit_code, 0);
    assert!(result.output.is_empty());
    assert!(
        result.errors.iter().any(|line| line.contains("MemoryError")),
        "{result:?}"
    );
}

#[tokio::test]
async fn test_memory_limit_can_be_raised() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());
    let overrides = LimitOverrides::new().with_memory_limit(2048);

    let result = runner
        .execute("python", &fixture_source("allocate.py"), Some(&overrides))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.output, (512 * 1024 * 1024).to_string());
}

#[tokio::test]
async fn test_file_writes_blocked() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("write_file.py"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_ne!(result.output, "written");
    assert!(!result.errors.is_empty());
    assert_no_workspaces(root.path());
}

#[tokio::test]
async fn test_output_is_capped() {
    let root = TempDir::new().unwrap();
    let mut runner_config = test_runner(root.path()).config().clone();
    runner_config.max_output_bytes = 1000;
    let runner = sandrun::Runner::new(runner_config);

    let result = runner
        .execute("python", "import sys\nsys.stdout.write('a' * 200000)", None)
        .await;

    assert!(result.is_success());
    assert!(result.output.starts_with(&"a".repeat(1000)));
    assert!(result.output.ends_with("(output truncated)"));
    assert!(result.output.len() < 1100);
}
