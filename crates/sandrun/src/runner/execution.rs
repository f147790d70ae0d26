//! Single execution: workspace, launch, supervision, classification
//!
//! The workspace is released before the result is returned on every path;
//! if this future is dropped or panics, the workspace's `Drop` removes it.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{Config, LanguageId};
use crate::runner::ExecuteError;
use crate::runner::classify::{Termination, classify};
use crate::sandbox::{
    InterpreterCommand, MetricsProbe, Outcome, ResourceLimiter, SandboxError, Supervisor,
    Workspace,
};
use crate::types::{ExecutionConfig, ExecutionResult};

/// Run `source` as `language` under `limits`
#[instrument(skip(config, source), fields(source_len = source.len()))]
pub async fn execute(
    config: &Config,
    language: LanguageId,
    source: &str,
    limits: &ExecutionConfig,
) -> Result<ExecutionResult, ExecuteError> {
    if let Some(name) = limits.zero_limit() {
        return Err(ExecuteError::InvalidLimit { name });
    }
    if source.len() > config.max_source_bytes {
        return Err(ExecuteError::SourceTooLarge {
            limit: config.max_source_bytes,
        });
    }

    let workspace =
        Workspace::create(config.workspace.root.clone(), config.workspace.prefix.clone()).await?;
    let result = run_in_workspace(config, language, source, limits, &workspace).await;
    workspace.close().await;

    result
}

async fn run_in_workspace(
    config: &Config,
    language: LanguageId,
    source: &str,
    limits: &ExecutionConfig,
    workspace: &Workspace,
) -> Result<ExecutionResult, ExecuteError> {
    let source_path = workspace
        .write_source(language.source_name(), source)
        .await?;

    let args = InterpreterCommand::new(language, source_path)
        .interpreter(config.interpreter(language))
        .build();
    debug!(?args, "interpreter command");

    let limiter = ResourceLimiter::from_config(limits);
    let supervisor = Supervisor::new(Duration::from_secs(limits.timeout_seconds))
        .max_output_bytes(config.max_output_bytes);

    let probe = MetricsProbe::start();
    let outcome = supervisor
        .run(&args, workspace.path(), &limiter)
        .await
        .map_err(|e| match e {
            SandboxError::SpawnFailed { .. } => ExecuteError::Launch(e),
            other => ExecuteError::Internal(other),
        })?;

    let result = match outcome {
        Outcome::Completed(run) => {
            let classification = classify(Termination::from_status(run.status), &run.stderr);
            let metrics = probe.finish();
            ExecutionResult {
                output: run.stdout.trim_end().to_owned(),
                errors: classification.errors,
                warnings: classification.warnings,
                execution_time_ms: metrics.execution_time_ms,
                memory_used_mb: metrics.memory_used_mb,
                cpu_time_seconds: metrics.cpu_time_seconds,
                status: classification.status,
                exit_code: classification.exit_code,
            }
        }
        Outcome::Killed => {
            let metrics = probe.finish();
            ExecutionResult {
                memory_used_mb: metrics.memory_used_mb,
                cpu_time_seconds: metrics.cpu_time_seconds,
                ..ExecutionResult::timed_out(limits.timeout_seconds)
            }
        }
    };

    debug!(
        status = %result.status,
        exit_code = result.exit_code,
        time_ms = result.execution_time_ms,
        "execution complete"
    );

    Ok(result)
}
