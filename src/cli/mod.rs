//! CLI module for execstream
//!
//! Provides command-line interface with the following subcommands:
//! - `stream` - Stream a command's combined output while it runs
//! - `capture` - Run a command and report stdout, stderr and exit code

pub mod commands;

pub use commands::{split_command, CaptureArgs, Cli, Commands, OutputFormat, StreamArgs};
