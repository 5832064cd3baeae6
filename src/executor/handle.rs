//! Streaming execution handle
//!
//! [`launch`] starts a child and returns at once with an [`Execution`]:
//! - an [`OutputStream`] over the child's combined stdout and stderr
//! - a [`Completion`] that resolves to the single terminal outcome
//!
//! A supervising task races the child's exit against the caller's
//! [`Signal`]. It publishes the outcome only after both output pipes have
//! been drained into the stream, so a reader that hits end-of-data and then
//! awaits completion has seen everything the child wrote.

use std::future::{pending, ready};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::process::Child;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::options::ExecOptions;
use super::process::{command_line, describe_status, spawn_piped};
use crate::error::ExecError;
use crate::signal::Signal;

/// Terminal outcome of an execution
pub type Outcome = Result<(), ExecError>;

/// Longest wait for a killed child's inherited pipes to close
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Bytes a forwarder still reads once told to stop (the Linux pipe size ceiling)
const STOPPED_READ_LIMIT: usize = 1024 * 1024;

/// Launch `program` with default [`ExecOptions`]
///
/// See [`launch_with`].
pub fn launch<S: AsRef<str>>(
    signal: &Signal,
    program: &str,
    args: &[S],
) -> Result<Execution, ExecError> {
    launch_with(signal, program, args, &ExecOptions::default())
}

/// Launch `program` and return a handle to its output and outcome
///
/// Must be called from within a tokio runtime; that is the only synchronous
/// failure. Failing to start the program (including a missing executable) is
/// reported through the handle's [`Completion`] instead.
///
/// # Errors
/// * `ExecError::Setup` - If there is no runtime to host the supervisor
pub fn launch_with<S: AsRef<str>>(
    signal: &Signal,
    program: &str,
    args: &[S],
    options: &ExecOptions,
) -> Result<Execution, ExecError> {
    let runtime = Handle::try_current().map_err(|e| ExecError::Setup(e.to_string()))?;
    let command = command_line(program, args);

    let (chunk_tx, chunk_rx) = mpsc::channel(options.buffer_chunks.max(1));
    let (done_tx, done_rx) = watch::channel(None);

    let mut execution = Execution {
        program: program.to_string(),
        command: command.clone(),
        pid: None,
        output: OutputStream::new(chunk_rx),
        completion: Completion {
            command: command.clone(),
            rx: done_rx,
        },
    };

    if let Some(interrupt) = signal.err() {
        tracing::debug!("Signal fired before launch ({}): {}", interrupt, command);
        drop(chunk_tx);
        done_tx.send_replace(Some(Err(interrupt.into())));
        return Ok(execution);
    }

    let mut child = match spawn_piped(program, args, &command) {
        Ok(child) => child,
        Err(err) => {
            tracing::debug!("Launch failed: {}", err);
            drop(chunk_tx);
            done_tx.send_replace(Some(Err(err)));
            return Ok(execution);
        }
    };
    execution.pid = child.id();

    let chunk_size = options.read_chunk_size.max(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut forwarders = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        forwarders.push(runtime.spawn(forward(
            stdout,
            chunk_tx.clone(),
            stop_rx.clone(),
            chunk_size,
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        forwarders.push(runtime.spawn(forward(stderr, chunk_tx.clone(), stop_rx, chunk_size)));
    }
    drop(chunk_tx);

    runtime.spawn(supervise(Supervisor {
        child,
        forwarders,
        stop: stop_tx,
        signal: signal.clone(),
        command,
        drain_grace: options.drain_grace,
        done: done_tx,
    }));

    Ok(execution)
}

/// A launched process: its live output plus its eventual outcome
///
/// Reading the `Execution` reads its [`OutputStream`]. Use
/// [`into_parts`](Execution::into_parts) to consume the stream and the
/// completion from different places.
///
/// The stream is bounded: awaiting completion without ever reading it can
/// stall a chatty child, the same way a child blocks on a pipe nobody reads.
/// Dropping the stream instead lets the output be discarded.
pub struct Execution {
    program: String,
    command: String,
    pid: Option<u32>,
    output: OutputStream,
    completion: Completion,
}

impl Execution {
    /// The program as passed to `launch`
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program and arguments as one line
    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process id, `None` if the process was never started
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// A new observer of this execution's outcome
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Wait for the terminal outcome
    pub async fn wait(&self) -> Outcome {
        self.completion.wait().await
    }

    /// The outcome, if it has been published
    pub fn try_outcome(&self) -> Option<Outcome> {
        self.completion.try_outcome()
    }

    /// Split into the output stream and the completion
    pub fn into_parts(self) -> (OutputStream, Completion) {
        (self.output, self.completion)
    }
}

impl AsyncRead for Execution {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.output).poll_read(cx, buf)
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("command", &self.command)
            .field("pid", &self.pid)
            .field("done", &self.completion.is_done())
            .finish()
    }
}

/// Combined stdout/stderr of a child
///
/// Once end-of-data has been returned, every later read returns it again.
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl OutputStream {
    fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl AsyncRead for OutputStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if this.pos < this.chunk.len() {
                let n = buf.remaining().min(this.chunk.len() - this.pos);
                buf.put_slice(&this.chunk[this.pos..this.pos + n]);
                this.pos += n;
                return Poll::Ready(Ok(()));
            }

            if this.finished {
                return Poll::Ready(Ok(()));
            }

            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    this.chunk = chunk;
                    this.pos = 0;
                }
                Poll::Ready(None) => this.finished = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// One-shot, multi-reader view of an execution's outcome
#[derive(Debug, Clone)]
pub struct Completion {
    command: String,
    rx: watch::Receiver<Option<Outcome>>,
}

impl Completion {
    /// Wait for the outcome. Every call returns the same value.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.rx.clone();
        let published = rx.wait_for(Option::is_some).await.map(|slot| (*slot).clone());

        match published {
            Ok(Some(outcome)) => outcome,
            _ => Err(self.lost()),
        }
    }

    /// The outcome if already published
    pub fn try_outcome(&self) -> Option<Outcome> {
        if let Some(outcome) = (*self.rx.borrow()).clone() {
            return Some(outcome);
        }
        // Closed without a value: the supervisor is gone for good.
        if self.rx.has_changed().is_err() {
            return Some(Err(self.lost()));
        }
        None
    }

    /// Whether an outcome is available without waiting
    pub fn is_done(&self) -> bool {
        self.try_outcome().is_some()
    }

    fn lost(&self) -> ExecError {
        ExecError::SupervisorLost {
            command: self.command.clone(),
        }
    }
}

struct Supervisor {
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
    stop: watch::Sender<bool>,
    signal: Signal,
    command: String,
    drain_grace: Option<Duration>,
    done: watch::Sender<Option<Outcome>>,
}

async fn supervise(sup: Supervisor) {
    let Supervisor {
        mut child,
        forwarders,
        stop,
        signal,
        command,
        drain_grace,
        done,
    } = sup;

    let raced = tokio::select! {
        biased;
        interrupt = signal.fired() => Err(interrupt),
        status = child.wait() => Ok(status),
    };

    let outcome: Outcome = match raced {
        Err(interrupt) => {
            tracing::debug!("Signal fired ({}), killing: {}", interrupt, command);
            if let Err(e) = child.start_kill() {
                tracing::warn!("Failed to kill {}: {}", command, e);
            }
            if let Err(e) = child.wait().await {
                tracing::warn!("Failed to reap {}: {}", command, e);
            }
            Err(interrupt.into())
        }
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(ExecError::CommandFailed {
            command: command.clone(),
            exit_code: status.code(),
            status: describe_status(status),
        }),
        Ok(Err(e)) => Err(ExecError::Io(e.to_string())),
    };

    if outcome.as_ref().is_err_and(ExecError::is_interrupt) {
        // Already interrupted: only a bounded wait for the pipes to close.
        let grace = drain_grace.map_or(KILL_DRAIN_GRACE, |g| g.min(KILL_DRAIN_GRACE));
        drain(forwarders, &stop, Some(grace), None, &command).await;
    } else {
        drain(forwarders, &stop, drain_grace, Some(&signal), &command).await;
    }

    match &outcome {
        Ok(()) => tracing::debug!("Completed: {}", command),
        Err(e) => tracing::debug!("Finished with error: {}", e),
    }
    done.send_replace(Some(outcome));
}

/// Wait for the pipe forwarders to reach end-of-data
///
/// When `grace` elapses or `signal` fires first, the forwarders are told to
/// stop waiting on their pipes. They still forward everything already read
/// or readable, so output the child wrote before it went away reaches the
/// stream no matter how slowly the stream is consumed.
async fn drain(
    forwarders: Vec<JoinHandle<()>>,
    stop: &watch::Sender<bool>,
    grace: Option<Duration>,
    signal: Option<&Signal>,
    command: &str,
) {
    let joined = async {
        for handle in forwarders {
            if let Err(e) = handle.await {
                tracing::warn!("Output forwarder of {} failed: {}", command, e);
            }
        }
    };
    tokio::pin!(joined);

    let expired = async {
        match grace {
            Some(grace) => tokio::time::sleep(grace).await,
            None => pending::<()>().await,
        }
    };

    let fired = async {
        match signal {
            Some(signal) => {
                signal.fired().await;
            }
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = &mut joined => return,
        _ = expired => {}
        _ = fired => {}
    }

    tracing::debug!("No longer waiting on output pipes of {}", command);
    stop.send_replace(true);
    joined.await;
}

/// Copy one pipe into the shared chunk queue until end-of-data
///
/// Once `stop` is set the forwarder no longer waits on the pipe, but keeps
/// reading while data is ready. Sends are never cut short.
///
/// If the stream has been dropped the pipe is still drained, so the child
/// never blocks on a full pipe or dies of a broken one.
async fn forward<R>(
    mut pipe: R,
    tx: mpsc::Sender<Vec<u8>>,
    mut stop: watch::Receiver<bool>,
    chunk_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size];
    let mut discarding = false;
    // None until stopped, then the bytes still allowed
    let mut left: Option<usize> = None;

    loop {
        let read = match left {
            None => tokio::select! {
                biased;
                read = pipe.read(&mut buf) => read,
                _ = stop_requested(&mut stop) => {
                    left = Some(STOPPED_READ_LIMIT);
                    continue;
                }
            },
            Some(0) => break,
            Some(_) => tokio::select! {
                biased;
                read = pipe.read(&mut buf) => read,
                _ = ready(()) => break,
            },
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                if let Some(left) = left.as_mut() {
                    *left = left.saturating_sub(n);
                }
                if !discarding && tx.send(buf[..n].to_vec()).await.is_err() {
                    discarding = true;
                }
            }
            Err(e) => {
                tracing::warn!("Error reading output: {}", e);
                break;
            }
        }
    }
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop.
    let _ = stop.wait_for(|stopped| *stopped).await;
}
