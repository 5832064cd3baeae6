//! Blocking capture of a command's stdout, stderr and exit code

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::process::{command_line, exit_code, spawn_piped};
use crate::error::{ExecError, RUNTIME_BUILD_FAILED};
use crate::signal::Signal;

/// Output of a command that ran to completion
///
/// `Capture::default()` (empty buffers, exit code 0) is what callers that
/// need a value on every path should substitute for an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    /// Everything written to stdout
    pub stdout: Vec<u8>,
    /// Everything written to stderr
    pub stderr: Vec<u8>,
    /// Exit code, `-1` if the process was killed by a signal it did not expect
    pub exit_code: i32,
}

impl Capture {
    /// Whether the command exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout as text, replacing invalid UTF-8
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// stderr as text, replacing invalid UTF-8
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a command to completion and capture its output
///
/// A non-zero exit code is not an error; it is reported in
/// [`Capture::exit_code`]. Output produced before a failure is discarded.
///
/// # Arguments
/// * `signal` - Optional deadline/cancellation; `None` waits for the process
/// * `program` - The program to execute (looked up on PATH, no shell)
/// * `args` - Command arguments
///
/// # Errors
/// * `ExecError::SpawnFailed` - If the program couldn't be started
/// * `ExecError::DeadlineExceeded` / `ExecError::Canceled` - If the signal fired first
/// * `ExecError::Io` - If waiting on the process or its pipes failed
pub async fn output<S: AsRef<str>>(
    signal: Option<&Signal>,
    program: &str,
    args: &[S],
) -> Result<Capture, ExecError> {
    let background = Signal::background();
    let signal = signal.unwrap_or(&background);
    if let Some(interrupt) = signal.err() {
        return Err(interrupt.into());
    }

    let command = command_line(program, args);
    let mut child = spawn_piped(program, args, &command)?;

    let stdout_task = tokio::spawn(collect(child.stdout.take()));
    let stderr_task = tokio::spawn(collect(child.stderr.take()));
    let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];

    let finished = async {
        let status = child.wait().await?;
        let stdout = join_output(stdout_task).await?;
        let stderr = join_output(stderr_task).await?;
        Ok::<_, ExecError>(Capture {
            stdout,
            stderr,
            exit_code: exit_code(status),
        })
    };

    let raced = tokio::select! {
        biased;
        interrupt = signal.fired() => Err(interrupt),
        result = finished => Ok(result),
    };

    match raced {
        Ok(result) => result,
        Err(interrupt) => {
            tracing::debug!("Signal fired ({}), killing: {}", interrupt, command);
            if let Err(e) = child.start_kill() {
                tracing::warn!("Failed to kill {}: {}", command, e);
            }
            if let Err(e) = child.wait().await {
                tracing::warn!("Failed to reap {}: {}", command, e);
            }
            for reader in &readers {
                reader.abort();
            }
            Err(interrupt.into())
        }
    }
}

/// Blocking wrapper around [`output`] for non-async code
///
/// Builds a current-thread runtime for the call, so it must not be called
/// from inside another runtime.
pub fn output_blocking<S: AsRef<str>>(
    signal: Option<&Signal>,
    program: &str,
    args: &[S],
) -> Result<Capture, ExecError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExecError::Setup(format!("{}: {}", RUNTIME_BUILD_FAILED, e)))?;

    rt.block_on(output(signal, program, args))
}

async fn collect<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn join_output(task: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, ExecError> {
    let bytes = task
        .await
        .map_err(|e| ExecError::Io(format!("output task failed: {}", e)))??;
    Ok(bytes)
}
