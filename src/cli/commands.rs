//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};

/// Run a command as a live output stream or as captured buffers.
///
/// Commands are executed directly (no shell); pass them after `--`.
#[derive(Parser, Debug)]
#[command(name = "execstream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream combined stdout/stderr of a command while it runs
    Stream(StreamArgs),

    /// Run a command to completion and report stdout, stderr and exit code
    Capture(CaptureArgs),
}

/// Arguments for the `stream` subcommand
#[derive(Parser, Debug)]
pub struct StreamArgs {
    /// Timeout in seconds (overrides the configured default, 0 for none)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Milliseconds to wait for inherited output pipes after exit
    #[arg(long)]
    pub drain_grace_ms: Option<u64>,

    /// Program and arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the `capture` subcommand
#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Timeout in seconds (overrides the configured default, 0 for none)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Program and arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Output format options
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pass stdout and stderr through and exit with the child's code
    Text,
    /// One JSON object with stdout, stderr and exit_code (or an error)
    Json,
}

/// Split a trailing command into program and arguments
pub fn split_command(command: &[String]) -> Option<(&str, &[String])> {
    command
        .split_first()
        .map(|(program, args)| (program.as_str(), args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_stream() {
        let cli = Cli::parse_from(["execstream", "stream", "--", "ls", "-la"]);
        assert!(!cli.verbose);

        match cli.command {
            Commands::Stream(args) => {
                assert_eq!(args.command, vec!["ls", "-la"]);
                assert!(args.timeout.is_none());
                assert!(args.drain_grace_ms.is_none());
            }
            _ => panic!("Expected Stream command"),
        }
    }

    #[test]
    fn test_cli_parse_stream_options() {
        let cli = Cli::parse_from([
            "execstream",
            "-v",
            "stream",
            "--timeout",
            "5",
            "--drain-grace-ms",
            "250",
            "bash",
            "./script.sh",
        ]);
        assert!(cli.verbose);

        match cli.command {
            Commands::Stream(args) => {
                assert_eq!(args.timeout, Some(5));
                assert_eq!(args.drain_grace_ms, Some(250));
                assert_eq!(args.command, vec!["bash", "./script.sh"]);
            }
            _ => panic!("Expected Stream command"),
        }
    }

    #[test]
    fn test_cli_parse_capture_json() {
        let cli = Cli::parse_from([
            "execstream",
            "capture",
            "--format",
            "json",
            "--",
            "sh",
            "-c",
            "exit 3",
        ]);

        match cli.command {
            Commands::Capture(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.command, vec!["sh", "-c", "exit 3"]);
            }
            _ => panic!("Expected Capture command"),
        }
    }

    #[test]
    fn test_cli_capture_default_format() {
        let cli = Cli::parse_from(["execstream", "capture", "echo", "hello"]);

        match cli.command {
            Commands::Capture(args) => assert_eq!(args.format, OutputFormat::Text),
            _ => panic!("Expected Capture command"),
        }
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["execstream", "stream"]).is_err());
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::parse_from(["execstream", "capture", "-c", "/tmp/x.toml", "--", "true"]);
        assert_eq!(cli.config, Some("/tmp/x.toml".to_string()));
    }

    #[test]
    fn test_split_command() {
        let command = vec!["echo".to_string(), "a".to_string(), "b".to_string()];
        let (program, args) = split_command(&command).unwrap();
        assert_eq!(program, "echo");
        assert_eq!(args, ["a", "b"]);

        assert!(split_command(&[]).is_none());
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }
}
