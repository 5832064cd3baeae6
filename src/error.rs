//! Error types for execstream
//!
//! Every terminal failure of an execution is an [`ExecError`]. Errors are
//! `Clone` so a single outcome can be observed any number of times.

use serde::Serialize;
use thiserror::Error;

use crate::signal::Interrupt;

/// Main error type for process execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The execution could not be set up at all (no runtime, no pipes)
    #[error("Failed to set up execution: {0}")]
    Setup(String),

    /// The platform refused to start the program
    #[error("Failed to spawn command: {command}: {error}")]
    SpawnFailed { command: String, error: String },

    /// The program ran but did not exit cleanly
    #[error("Command failed: {command}: {status}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        status: String,
    },

    /// The signal's deadline elapsed before the process finished
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The signal was canceled before the process finished
    #[error("canceled")]
    Canceled,

    /// Waiting on the child failed
    #[error("IO error: {0}")]
    Io(String),

    /// The supervising task went away without publishing an outcome
    #[error("Supervisor for {command} exited without reporting an outcome")]
    SupervisorLost { command: String },
}

impl ExecError {
    /// True for the two process-error variants (start failure or bad exit)
    pub fn is_process_error(&self) -> bool {
        matches!(
            self,
            ExecError::SpawnFailed { .. } | ExecError::CommandFailed { .. }
        )
    }

    /// True when the error came from the signal rather than the process
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ExecError::DeadlineExceeded | ExecError::Canceled)
    }
}

impl From<Interrupt> for ExecError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::DeadlineExceeded => ExecError::DeadlineExceeded,
            Interrupt::Canceled => ExecError::Canceled,
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        ExecError::Io(err.to_string())
    }
}

/// Prefix of the `Setup` message when a blocking call cannot build its runtime
pub(crate) const RUNTIME_BUILD_FAILED: &str = "Failed to create runtime";

/// Serializable error info for JSON reports
#[derive(Debug, Serialize, Clone)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl From<&ExecError> for ErrorInfo {
    fn from(err: &ExecError) -> Self {
        let (error_type, exit_code) = match err {
            ExecError::Setup(_) => ("setup_failed", None),
            ExecError::SpawnFailed { .. } => ("spawn_failed", None),
            ExecError::CommandFailed { exit_code, .. } => ("command_failed", *exit_code),
            ExecError::DeadlineExceeded => ("deadline_exceeded", None),
            ExecError::Canceled => ("canceled", None),
            ExecError::Io(_) => ("io_error", None),
            ExecError::SupervisorLost { .. } => ("supervisor_lost", None),
        };

        ErrorInfo {
            message: err.to_string(),
            error_type: error_type.to_string(),
            suggestion: suggest_fix(err),
            exit_code,
        }
    }
}

/// Suggest fixes for common error patterns
pub fn suggest_fix(err: &ExecError) -> Option<String> {
    match err {
        ExecError::SpawnFailed { error, .. } => {
            if error.contains("not found") {
                return Some("Check that the program is installed and on PATH.".to_string());
            }
            if error.contains("Permission denied") {
                return Some(
                    "Permission denied. Check that the file is executable.".to_string(),
                );
            }
            None
        }
        ExecError::DeadlineExceeded => Some(
            "Try increasing the timeout or checking if the command hangs".to_string(),
        ),
        ExecError::Setup(message) if message.starts_with(RUNTIME_BUILD_FAILED) => Some(
            "Could not build a runtime for the blocking call; check thread and file descriptor limits."
                .to_string(),
        ),
        ExecError::Setup(_) => {
            Some("Executions must be launched from inside a tokio runtime.".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failed_names_command() {
        let err = ExecError::SpawnFailed {
            command: "command_no_found abc".to_string(),
            error: "executable file not found in $PATH".to_string(),
        };
        assert!(err.to_string().contains("command_no_found"));
        assert!(err.is_process_error());
        assert!(!err.is_interrupt());

        let info = ErrorInfo::from(&err);
        assert_eq!(info.error_type, "spawn_failed");
        assert!(info.suggestion.unwrap().contains("PATH"));
    }

    #[test]
    fn test_command_failed_error() {
        let err = ExecError::CommandFailed {
            command: "false".to_string(),
            exit_code: Some(1),
            status: "exit status 1".to_string(),
        };
        assert_eq!(err.to_string(), "Command failed: false: exit status 1");

        let info = ErrorInfo::from(&err);
        assert_eq!(info.exit_code, Some(1));
        assert!(info.suggestion.is_none());
    }

    #[test]
    fn test_interrupt_conversion() {
        assert_eq!(
            ExecError::from(Interrupt::DeadlineExceeded),
            ExecError::DeadlineExceeded
        );
        assert_eq!(ExecError::from(Interrupt::Canceled), ExecError::Canceled);
        assert!(ExecError::Canceled.is_interrupt());
    }

    #[test]
    fn test_suggest_fix_permission_denied() {
        let err = ExecError::SpawnFailed {
            command: "./script.sh".to_string(),
            error: "Permission denied (os error 13)".to_string(),
        };
        assert!(suggest_fix(&err).unwrap().contains("executable"));
    }

    #[test]
    fn test_suggest_fix_setup_depends_on_cause() {
        let no_runtime = ExecError::Setup(
            "there is no reactor running, must be called from the context of a Tokio 1.x runtime"
                .to_string(),
        );
        assert!(suggest_fix(&no_runtime).unwrap().contains("inside a tokio runtime"));

        let build_failed = ExecError::Setup(format!(
            "{}: Too many open files (os error 24)",
            RUNTIME_BUILD_FAILED
        ));
        let hint = suggest_fix(&build_failed).unwrap();
        assert!(hint.contains("file descriptor limits"));
        assert!(!hint.contains("inside a tokio runtime"));
    }

    #[test]
    fn test_suggest_fix_no_match() {
        assert!(suggest_fix(&ExecError::Canceled).is_none());
    }

    #[test]
    fn test_error_info_skips_empty_fields() {
        let info = ErrorInfo::from(&ExecError::Canceled);

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"error_type\":\"canceled\""));
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("exit_code"));
    }
}
