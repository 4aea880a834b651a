//! Blocking execution of external tools.

use linkguard_core::{HarnessError, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tracing::{debug, error};

/// `status` recorded when the process could not be spawned at all.
pub(crate) const NOT_STARTED: &str = "not started";

/// Render a command line for logs and error messages.
pub(crate) fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run `cmd` to completion; a non-zero exit is an error.
pub(crate) fn run(cmd: &mut Command) -> Result<Output> {
    let line = describe(cmd);
    debug!(target: "linkguard::command", command = %line, "Running");
    let output = cmd.output().map_err(|e| {
        error!(target: "linkguard::command", command = %line, error = %e, "Failed to execute");
        HarnessError::Command {
            command: line.clone(),
            status: NOT_STARTED.to_string(),
            stderr: e.to_string(),
        }
    })?;
    check_status(line, output)
}

/// Run `cmd` feeding `input` on stdin; a non-zero exit is an error.
pub(crate) fn run_with_stdin(cmd: &mut Command, input: &str) -> Result<Output> {
    let line = describe(cmd);
    debug!(target: "linkguard::command", command = %line, "Running with stdin");
    let spawn_err = |e: std::io::Error| HarnessError::Command {
        command: line.clone(),
        status: NOT_STARTED.to_string(),
        stderr: e.to_string(),
    };
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    check_status(line, output)
}

fn check_status(line: String, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    error!(target: "linkguard::command", command = %line, status = %output.status, stderr = %stderr, "Command failed");
    Err(HarnessError::Command {
        command: line,
        status: output.status.to_string(),
        stderr,
    })
}

/// Stdout as trimmed UTF-8.
pub(crate) fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("udevadm");
        cmd.args(["settle", "--timeout=30"]);
        assert_eq!(describe(&cmd), "udevadm settle --timeout=30");
    }

    #[test]
    fn test_missing_program_is_command_error() {
        let err = run(&mut Command::new("/nonexistent/linkguard-tool")).unwrap_err();
        match err {
            HarnessError::Command { status, .. } => assert_eq!(status, NOT_STARTED),
            other => panic!("unexpected error: {other}"),
        }
    }
}
