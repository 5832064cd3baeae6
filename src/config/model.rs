//! Configuration model for execstream

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::executor::{ExecOptions, Executor, DEFAULT_BUFFER_CHUNKS, DEFAULT_READ_CHUNK_SIZE};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Default settings applied to every command
    #[serde(default)]
    pub defaults: Defaults,

    /// Streaming-mode settings
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Default settings applied to every command
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Default timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub timeout: u64,
}

/// Streaming-mode settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StreamConfig {
    /// Output chunks buffered ahead of the reader
    #[serde(default = "default_buffer_chunks")]
    pub buffer_chunks: usize,

    /// Maximum bytes per chunk
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Milliseconds to wait for inherited pipes after exit (0 = forever)
    #[serde(default)]
    pub drain_grace_ms: u64,
}

fn default_buffer_chunks() -> usize {
    DEFAULT_BUFFER_CHUNKS
}

fn default_read_chunk_size() -> usize {
    DEFAULT_READ_CHUNK_SIZE
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_chunks: default_buffer_chunks(),
            read_chunk_size: default_read_chunk_size(),
            drain_grace_ms: 0,
        }
    }
}

impl Config {
    /// The default timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.defaults.timeout > 0).then(|| Duration::from_secs(self.defaults.timeout))
    }

    /// Stream options described by this config
    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            buffer_chunks: self.stream.buffer_chunks,
            read_chunk_size: self.stream.read_chunk_size,
            drain_grace: (self.stream.drain_grace_ms > 0)
                .then(|| Duration::from_millis(self.stream.drain_grace_ms)),
        }
    }

    /// An executor carrying this config's timeout and stream options
    pub fn executor(&self) -> Executor {
        let executor = Executor::new().with_options(self.exec_options());
        match self.timeout() {
            Some(timeout) => executor.with_timeout(timeout),
            None => executor,
        }
    }
}
