//! execstream - run subprocesses as live streams or captured buffers
//!
//! Two ways to run an external command, both bounded by a caller-owned
//! [`Signal`] (deadline and/or explicit cancellation):
//!
//! - **Streaming** - [`launch`] returns an [`Execution`] immediately. Its
//!   combined stdout/stderr is readable while the process runs, and its
//!   [`Completion`] resolves exactly once to success, a process error,
//!   `DeadlineExceeded` or `Canceled`.
//! - **Capture** - [`output`] runs the command to completion and returns
//!   separate stdout/stderr buffers and the exit code. A non-zero exit code
//!   is not an error.
//!
//! ```no_run
//! # async fn demo() -> Result<(), execstream::ExecError> {
//! use std::time::Duration;
//! use tokio::io::AsyncReadExt;
//!
//! let (signal, _canceler) = execstream::Signal::with_timeout(Duration::from_secs(5));
//! let mut execution = execstream::launch(&signal, "ls", &["-la"])?;
//!
//! let mut listing = Vec::new();
//! execution.read_to_end(&mut listing).await.ok();
//! execution.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod signal;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{ErrorInfo, ExecError};
pub use executor::{
    launch, launch_with, output, output_blocking, Capture, Completion, ExecOptions, Execution,
    Executor, Outcome, OutputStream,
};
pub use signal::{Canceler, Interrupt, Signal};
