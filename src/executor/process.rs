//! Launch primitive shared by the streaming handle and the capture façade

use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::error::ExecError;

/// Render a program and its arguments for diagnostics
pub fn command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg.as_ref());
    }
    line
}

/// Spawn `program` with stdout and stderr piped and stdin closed
///
/// The child is killed if its handle is dropped before it is reaped.
pub(crate) fn spawn_piped<S: AsRef<str>>(
    program: &str,
    args: &[S],
    command: &str,
) -> Result<Child, ExecError> {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(AsRef::as_ref));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    tracing::debug!("Executing: {}", command);

    cmd.spawn().map_err(|e| spawn_error(program, command, &e))
}

fn spawn_error(program: &str, command: &str, err: &std::io::Error) -> ExecError {
    let bare_name = !program.contains('/') && !program.contains(std::path::MAIN_SEPARATOR);
    let error = if err.kind() == ErrorKind::NotFound && bare_name && which::which(program).is_err()
    {
        "executable file not found in $PATH".to_string()
    } else {
        err.to_string()
    };

    ExecError::SpawnFailed {
        command: command.to_string(),
        error,
    }
}

/// Describe how a process ended, e.g. `exit status 2` or `signal: 9`
pub(crate) fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal: {}", signal);
        }
    }

    status.to_string()
}

/// Exit code of a finished process, `-1` when it was terminated by a signal
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
