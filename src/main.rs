//! execstream CLI entry point
//!
//! Usage:
//!   execstream stream [--timeout SECS] -- PROGRAM [ARGS...]
//!   execstream capture [--timeout SECS] [--format text|json] -- PROGRAM [ARGS...]

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::io::AsyncWriteExt;

use execstream::cli::{split_command, CaptureArgs, Cli, Commands, OutputFormat, StreamArgs};
use execstream::config::{load_config, Config};
use execstream::error::ErrorInfo;
use execstream::{logging, Executor, Signal};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Stream(args) => stream_command(args, &config).await,
        Commands::Capture(args) => capture_command(args, &config).await,
    }
}

/// Build the executor for a run, letting `--timeout` replace the configured default
fn executor_for(config: &Config, timeout: Option<u64>) -> Executor {
    let executor = config.executor();
    match timeout {
        Some(0) => Executor::new().with_options(executor.options().clone()),
        Some(secs) => executor.with_timeout(Duration::from_secs(secs)),
        None => executor,
    }
}

/// Cancel `signal` on Ctrl-C; the returned task should be aborted when done
fn cancel_on_ctrl_c() -> (Signal, tokio::task::JoinHandle<()>) {
    let (signal, canceler) = Signal::with_cancel();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, canceling");
            canceler.cancel();
        }
    });
    (signal, watcher)
}

/// Stream a command's combined output to stdout
async fn stream_command(args: StreamArgs, config: &Config) -> Result<ExitCode> {
    let (program, rest) = split_command(&args.command).context("No command given")?;

    let mut executor = executor_for(config, args.timeout);
    if let Some(ms) = args.drain_grace_ms {
        let options = executor
            .options()
            .clone()
            .with_drain_grace(Duration::from_millis(ms));
        executor = executor.with_options(options);
    }

    let (signal, watcher) = cancel_on_ctrl_c();
    let mut execution = executor.launch(&signal, program, rest)?;

    let mut stdout = tokio::io::stdout();
    let copied = tokio::io::copy(&mut execution, &mut stdout)
        .await
        .context("Failed to copy output")?;
    stdout.flush().await?;

    let outcome = execution.wait().await;
    watcher.abort();

    tracing::debug!("{} bytes streamed from {}", copied, execution.command());
    outcome?;
    Ok(ExitCode::SUCCESS)
}

/// Run a command to completion and report what it produced
async fn capture_command(args: CaptureArgs, config: &Config) -> Result<ExitCode> {
    let (program, rest) = split_command(&args.command).context("No command given")?;
    let executor = executor_for(config, args.timeout);

    let (signal, watcher) = cancel_on_ctrl_c();
    let result = executor.output(Some(&signal), program, rest).await;
    watcher.abort();

    match args.format {
        OutputFormat::Json => {
            let (json, code) = match &result {
                Ok(capture) => (
                    serde_json::json!({
                        "stdout": capture.stdout_lossy(),
                        "stderr": capture.stderr_lossy(),
                        "exit_code": capture.exit_code,
                    }),
                    ExitCode::SUCCESS,
                ),
                Err(e) => (
                    serde_json::json!({ "error": ErrorInfo::from(e) }),
                    ExitCode::FAILURE,
                ),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(code)
        }
        OutputFormat::Text => {
            let capture = result?;

            let mut stdout = tokio::io::stdout();
            stdout.write_all(&capture.stdout).await?;
            stdout.flush().await?;
            let mut stderr = tokio::io::stderr();
            stderr.write_all(&capture.stderr).await?;
            stderr.flush().await?;

            Ok(ExitCode::from(exit_byte(capture.exit_code)))
        }
    }
}

/// Map a child's exit code onto ours; out-of-range codes become 1
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
