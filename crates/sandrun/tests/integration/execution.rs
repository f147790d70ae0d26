use sandrun::{ExecutionConfig, ExecutionStatus, LimitOverrides, execute};
use tempfile::TempDir;

use super::{fixture_source, test_runner};

#[tokio::test]
async fn test_python_hello_world() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("hello.py"), None)
        .await;

    assert!(result.is_success());
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output, "Hello, World!");
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert!(result.execution_time_ms > 0.0);
    assert!(result.memory_used_mb >= 0.0);
    assert!(result.cpu_time_seconds >= 0.0);
}

#[tokio::test]
async fn test_javascript_hello_world() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("javascript", &fixture_source("hello.js"), None)
        .await;

    assert!(result.is_success(), "unexpected result: {result:?}");
    assert_eq!(result.output, "Hello, World!");
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn test_language_aliases() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    for (language, name) in [("py", "hello.py"), ("js", "hello.js")] {
        let result = runner.execute(language, &fixture_source(name), None).await;
        assert!(result.is_success(), "{language}: {result:?}");
        assert_eq!(result.output, "Hello, World!");
    }
}

#[tokio::test]
async fn test_free_execute_function() {
    let result = execute("python", "print(6 * 7)", &ExecutionConfig::default()).await;
    assert!(result.is_success());
    assert_eq!(result.output, "42");

    let config = ExecutionConfig::default().with_memory_limit(8192);
    let result = execute("javascript", "console.log(6 * 7)", &config).await;
    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.output, "42");
}

#[tokio::test]
async fn test_python_warning_is_not_an_error() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("warn.py"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.output, "done");
    assert!(result.errors.is_empty());
    assert!(result.warnings.iter().any(|w| w.contains("UserWarning: careful")));
}

#[tokio::test]
async fn test_javascript_warning_is_not_an_error() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("javascript", &fixture_source("warn.js"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Success, "{result:?}");
    assert_eq!(result.output, "done");
    assert!(result.warnings.iter().any(|w| w.contains("Warning: careful")));
}

#[tokio::test]
async fn test_python_exception() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("raise.py"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.output, "before");
    assert_eq!(
        result.errors.last().map(String::as_str),
        Some("ValueError: bad input")
    );
    // Traceback frames keep their indentation
    assert!(result.errors.iter().any(|line| line.starts_with("  File ")));
}

#[tokio::test]
async fn test_javascript_exception() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("javascript", &fixture_source("throw.js"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.output, "before");
    assert!(result.errors.iter().any(|line| line.contains("Error: boom")));
}

#[tokio::test]
async fn test_stdout_trailing_whitespace_trimmed() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", "print('  indented')\nprint()\nprint('   ')", None)
        .await;

    assert!(result.is_success());
    assert_eq!(result.output, "  indented");
}

#[tokio::test]
async fn test_source_is_written_verbatim() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    // Quotes, backslashes, shell metacharacters and non-ASCII text
    let source = "s = 'a\"b\\\\c $HOME `x` ; | é ✓'\nprint(s)\n";
    let result = runner.execute("python", source, None).await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.output, "a\"b\\c $HOME `x` ; | é ✓");
}

#[tokio::test]
async fn test_stdin_is_empty() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("stdin.py"), None)
        .await;

    assert!(result.is_success());
    assert_eq!(result.output, "''");
}

#[tokio::test]
async fn test_segfault_reports_negative_signal() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner
        .execute("python", &fixture_source("segfault.py"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, -11);
    assert!(!result.errors.is_empty());
}

#[tokio::test]
async fn test_unsupported_language() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    let result = runner.execute("ruby", "puts 'hi'", None).await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.errors, vec!["Unsupported language: ruby"]);
    assert_eq!(result.execution_time_ms, 0.0);
}

#[tokio::test]
async fn test_concurrent_executions_are_independent() {
    let root = TempDir::new().unwrap();
    let runner = std::sync::Arc::new(test_runner(root.path()));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move {
                let (language, source) = if i % 2 == 0 {
                    ("python", format!("print({i})"))
                } else {
                    ("javascript", format!("console.log({i})"))
                };
                let overrides = LimitOverrides::new().with_timeout(10);
                (i, runner.execute(language, &source, Some(&overrides)).await)
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        assert!(result.is_success(), "run {i}: {result:?}");
        assert_eq!(result.output, i.to_string());
    }
    super::assert_no_workspaces(root.path());
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let root = TempDir::new().unwrap();
    let runner = test_runner(root.path());

    for language in ["python", "javascript"] {
        let source = if language == "python" {
            "print('ok')"
        } else {
            "console.log('ok')"
        };
        let first = runner.execute(language, source, None).await;
        let second = runner.execute(language, source, None).await;

        assert!(first.is_success(), "{language}: {first:?}");
        assert_eq!(first.status, second.status);
        assert_eq!(first.exit_code, second.exit_code);
        assert_eq!(first.output, "ok");
        assert_eq!(first.output, second.output);
    }
}
