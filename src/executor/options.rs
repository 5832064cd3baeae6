//! Execution options and a defaults-carrying executor

use std::time::Duration;

use super::capture::{output, Capture};
use super::handle::{launch_with, Execution};
use crate::error::ExecError;
use crate::signal::Signal;

/// Default number of output chunks buffered between the pipes and the stream
pub const DEFAULT_BUFFER_CHUNKS: usize = 64;

/// Default maximum size of one forwarded chunk (in bytes)
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024; // 8KB

/// Options for a streaming execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Chunks buffered before the child is back-pressured
    pub buffer_chunks: usize,
    /// Maximum bytes per chunk read from a pipe
    pub read_chunk_size: usize,
    /// How long to wait for the pipes to close once the child is gone
    /// (None = wait until they close)
    pub drain_grace: Option<Duration>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            buffer_chunks: DEFAULT_BUFFER_CHUNKS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            drain_grace: None,
        }
    }
}

impl ExecOptions {
    /// Set the number of buffered chunks
    pub fn with_buffer_chunks(mut self, chunks: usize) -> Self {
        self.buffer_chunks = chunks;
        self
    }

    /// Set the maximum chunk size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Bound the wait for inherited pipes to close
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = Some(grace);
        self
    }
}

/// Launches commands with a default timeout and stream options
///
/// The default timeout tightens whatever signal the caller passes; it never
/// loosens a deadline the caller already set.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    /// Default timeout for commands
    default_timeout: Option<Duration>,
    /// Options for streaming executions
    options: ExecOptions,
}

impl Executor {
    /// Create a new executor with no timeout and default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Set the stream options
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// The default timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// The stream options
    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    fn bound(&self, signal: Option<&Signal>) -> Option<Signal> {
        match (signal, self.default_timeout) {
            (Some(signal), Some(timeout)) => Some(signal.timeout(timeout)),
            (Some(signal), None) => Some(signal.clone()),
            (None, Some(timeout)) => Some(Signal::background().timeout(timeout)),
            (None, None) => None,
        }
    }

    /// Launch a streaming execution
    pub fn launch<S: AsRef<str>>(
        &self,
        signal: &Signal,
        program: &str,
        args: &[S],
    ) -> Result<Execution, ExecError> {
        let signal = self.bound(Some(signal)).unwrap_or_default();
        launch_with(&signal, program, args, &self.options)
    }

    /// Run a command to completion and capture its output
    pub async fn output<S: AsRef<str>>(
        &self,
        signal: Option<&Signal>,
        program: &str,
        args: &[S],
    ) -> Result<Capture, ExecError> {
        let signal = self.bound(signal);
        output(signal.as_ref(), program, args).await
    }
}
