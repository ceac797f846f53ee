//! Wrapper around process::Command that does error handling for the backends.

use crate::error;
use crate::Result;
use snafu::{ensure, ResultExt};
use std::process::{Command, Output};

/// Runs `command` to completion, failing if it can't be started or exits unsuccessfully.
pub(crate) fn run(mut command: Command) -> Result<Output> {
    let description = format!("{:?}", command);
    trace!("Running {}", description);
    let output = command.output().context(error::ExecutionFailureSnafu {
        command: &description,
    })?;

    ensure!(
        output.status.success(),
        error::CommandFailureSnafu {
            command: description,
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout),
            stderr: String::from_utf8_lossy(&output.stderr),
        }
    );
    Ok(output)
}

#[cfg(all(test, unix))]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn missing_program() {
        let err = run(Command::new("/nonexistent/cloud-config/program")).unwrap_err();
        assert!(matches!(err, Error::ExecutionFailure { .. }));
    }

    #[test]
    fn failing_program() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "echo nope >&2; exit 3"]);
        match run(command).unwrap_err() {
            Error::CommandFailure { stderr, .. } => assert_eq!(stderr.trim(), "nope"),
            e => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn successful_program() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "echo ok"]);
        let output = run(command).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
    }
}
