//! Command execution module
//!
//! Provides two ways to run a command under a [`Signal`](crate::Signal):
//! - Streaming: [`launch`] returns an [`Execution`] whose combined output can
//!   be read while the process runs, plus a one-shot [`Completion`]
//! - Capture: [`output`] runs to completion and returns separate stdout and
//!   stderr buffers with the exit code

pub mod capture;
pub mod handle;
pub mod options;
pub mod process;

pub use capture::{output, output_blocking, Capture};
pub use handle::{launch, launch_with, Completion, Execution, Outcome, OutputStream};
pub use options::{ExecOptions, Executor, DEFAULT_BUFFER_CHUNKS, DEFAULT_READ_CHUNK_SIZE};
pub use process::command_line;
