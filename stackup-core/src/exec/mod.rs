//! External tool invocation. Every external program is run from a typed
//! argument list; there is no shell interpolation anywhere in the pipeline.

use std::{ffi::OsStr, path::PathBuf, process::Stdio};
use tokio::process::Command;

pub use process::*;

mod process;

#[derive(Debug, Default, Copy, Clone)]
pub enum Output {
    #[default]
    Null,
    Inherit,
    Capture,
}

impl From<Output> for Stdio {
    fn from(v: Output) -> Self {
        match v {
            Output::Null => Stdio::null(),
            Output::Inherit => Stdio::inherit(),
            Output::Capture => Stdio::piped(),
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Options {
    pub stdout: Output,
    pub stderr: Output,
}

impl Options {
    pub fn capture_output() -> Options {
        Options {
            stdout: Output::Capture,
            stderr: Output::Capture,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to start process")]
    FailedToStartProcess(#[source] std::io::Error),
    #[error("error reading from subprocess output")]
    SubprocessIoError(#[source] std::io::Error),
    #[error("error getting subprocess status")]
    SubprocessStatusError(#[source] std::io::Error),
    #[error("subprocess stdin is not available")]
    StdinUnavailable,
    #[error("{}", failure_message(.status, .stderr))]
    CommandFailed { status: ExitStatus, stderr: String },
    #[error("service did not become ready within {}s", .0.as_secs())]
    ReadinessTimeout(std::time::Duration),
}

fn failure_message(status: &ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        status.message()
    } else {
        format!("{} ({})", status.message(), stderr)
    }
}

/// Location of an external tool binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub path: PathBuf,
}

impl CommandConfig {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        CommandConfig { path: path.into() }
    }

    /// Whether the binary resolves, either as a path or on PATH.
    pub fn found(&self) -> bool {
        which::which(&self.path).is_ok()
    }

    pub fn spawn(
        &self,
        args: &[impl AsRef<OsStr>],
        options: &Options,
    ) -> Result<ToolProcess, Error> {
        self.spawn_with_stdin(args, options, Stdio::null())
    }

    pub fn spawn_with_stdin(
        &self,
        args: &[impl AsRef<OsStr>],
        options: &Options,
        stdin: impl Into<Stdio>,
    ) -> Result<ToolProcess, Error> {
        let mut cmd = Command::new(&self.path);
        cmd.stdin(stdin)
            .stdout(options.stdout)
            .stderr(options.stderr)
            // kill-on-drop is a final fallback, normally the process is waited for
            .kill_on_drop(true);
        for arg in args {
            cmd.arg(arg.as_ref());
        }
        let child = cmd.spawn().map_err(Error::FailedToStartProcess)?;
        Ok(ToolProcess { child })
    }

    /// Runs to completion with captured output.
    pub async fn output(&self, args: &[impl AsRef<OsStr>]) -> Result<CommandOutput, Error> {
        self.spawn(args, &Options::capture_output())?
            .wait_with_output()
            .await
    }

    /// Runs to completion with captured output, failing on a non-zero exit.
    pub async fn check_output(&self, args: &[impl AsRef<OsStr>]) -> Result<CommandOutput, Error> {
        self.output(args).await?.check()
    }
}

/// Runs a best-effort step: a failure is logged as a warning and swallowed so
/// the steps after it still run.
pub async fn tolerated<T, E>(
    step: &str,
    op: impl std::future::Future<Output = Result<T, E>>,
) -> Option<T>
where
    E: std::fmt::Display,
{
    match op.await {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(%error, "{} failed, continuing", step);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_exit_code_in_failure_message() {
        let message = failure_message(&ExitStatus::Failed(Some(3)), "");
        assert_eq!(message, "process exited with error status 3");
    }

    #[test]
    fn should_append_stderr_to_failure_message() {
        let message = failure_message(&ExitStatus::Failed(Some(1)), "no such container\n");
        assert_eq!(
            message,
            "process exited with error status 1 (no such container)"
        );
    }
}
