//! Sandrun CLI
//!
//! A command-line tool for running Python and JavaScript snippets under
//! resource limits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sandrun::{Config, EXAMPLE_CONFIG, LanguageId, LimitOverrides, Runner};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sandrun")]
#[command(about = "A tool for running code snippets under resource limits")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Apply SANDBOX_TIMEOUT, MAX_MEMORY and SANDBOX_CPU_TIME from the environment
    #[arg(short, long, global = true)]
    env: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: sandrun.toml)
        #[arg(short, long, default_value = "sandrun.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (python, javascript, or an alias such as py or js)
        #[arg(short, long)]
        language: String,

        /// Wall clock limit in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Address space limit in MB
        #[arg(short, long)]
        memory_limit: Option<u64>,

        /// CPU time limit in seconds
        #[arg(long)]
        cpu_time: Option<u64>,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    if cli.env {
        config = config
            .with_env_overrides()
            .context("invalid environment override")?;
    }

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            timeout,
            memory_limit,
            cpu_time,
        } => {
            let overrides = LimitOverrides {
                timeout_seconds: timeout,
                memory_limit_mb: memory_limit,
                cpu_time_limit_seconds: cpu_time,
            };
            run_execute(config, &source, &language, overrides).await
        }
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_execute(
    config: Config,
    source: &Path,
    language: &str,
    overrides: LimitOverrides,
) -> Result<()> {
    let source_content = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    info!(language, "running program");

    // Only pass overrides that were given so per-language limits still apply
    let runner = Runner::new(config);
    let overrides = (!overrides.is_empty()).then_some(&overrides);
    let result = runner.execute(language, &source_content, overrides).await;

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    for warning in &result.warnings {
        eprintln!("{warning}");
    }
    for error in &result.errors {
        eprintln!("{error}");
    }

    // Log execution info via tracing (stderr), keeping stdout clean for piping
    info!(
        status = %result.status,
        time = format_args!("{:.3}ms", result.execution_time_ms),
        cpu = format_args!("{:.3}s", result.cpu_time_seconds),
        memory = format_args!("{:.2} MB", result.memory_used_mb),
        exit_code = result.exit_code,
        "execution result"
    );

    if result.is_success() {
        Ok(())
    } else {
        let code = if result.exit_code > 0 {
            result.exit_code
        } else {
            1
        };
        std::process::exit(code);
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for id in LanguageId::ALL {
        println!(
            "  {:<12} {} ({})",
            id.as_str(),
            id.name(),
            config.interpreter(id).display()
        );
    }
}

fn show_config(config: &Config) {
    println!("Default limits:");
    println!("  Timeout: {}s", config.defaults.timeout_seconds);
    println!("  Memory limit: {} MB", config.defaults.memory_limit_mb);
    println!("  CPU time limit: {}s", config.defaults.cpu_time_limit());
    println!();
    println!("Max source size: {} bytes", config.max_source_bytes);
    println!("Max output per stream: {} bytes", config.max_output_bytes);
    println!();
    match &config.workspace.root {
        Some(root) => println!("Workspace root: {}", root.display()),
        None => println!("Workspace root: {}", std::env::temp_dir().display()),
    }
    println!("Workspace prefix: {}", config.workspace.prefix);
    println!();
    for id in LanguageId::ALL {
        let limits = config.language_limits(id);
        println!(
            "{}: {} (timeout {}s, memory {} MB, cpu {}s)",
            id.as_str(),
            config.interpreter(id).display(),
            limits.timeout_seconds,
            limits.memory_limit_mb,
            limits.cpu_time_limit()
        );
    }
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
