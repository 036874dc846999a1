use super::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, ChildStderr, ChildStdin, ChildStdout},
};

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum ExitStatus {
    Successful,
    Failed(Option<i32>),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self == &ExitStatus::Successful
    }

    pub fn check_status(&self) -> Result<(), Error> {
        match self {
            ExitStatus::Successful => Ok(()),
            ExitStatus::Failed(_) => Err(Error::CommandFailed {
                status: *self,
                stderr: String::new(),
            }),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ExitStatus::Successful => "process exited successfully".to_owned(),
            ExitStatus::Failed(Some(code)) => {
                format!("process exited with error status {}", code)
            }
            ExitStatus::Failed(None) => "process exited with unknown error status".to_owned(),
        }
    }
}

/// Captured result of a finished external invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn check(self) -> Result<CommandOutput, Error> {
        match self.status {
            ExitStatus::Successful => Ok(self),
            ExitStatus::Failed(_) => Err(Error::CommandFailed {
                status: self.status,
                stderr: self.stderr,
            }),
        }
    }
}

#[derive(Debug)]
pub struct ToolProcess {
    pub(crate) child: Child,
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: &mut Option<R>) -> std::io::Result<String> {
    let mut buf = String::new();
    if let Some(pipe) = pipe {
        pipe.read_to_string(&mut buf).await?;
    }
    Ok(buf)
}

impl ToolProcess {
    pub fn stdin(&mut self) -> &mut Option<ChildStdin> {
        &mut self.child.stdin
    }

    pub fn stdout(&mut self) -> &mut Option<ChildStdout> {
        &mut self.child.stdout
    }

    pub fn stderr(&mut self) -> &mut Option<ChildStderr> {
        &mut self.child.stderr
    }

    pub async fn wait(&mut self) -> Result<ExitStatus, Error> {
        let proc_status = self
            .child
            .wait()
            .await
            .map_err(Error::SubprocessStatusError)?;
        if proc_status.success() {
            Ok(ExitStatus::Successful)
        } else {
            Ok(ExitStatus::Failed(proc_status.code()))
        }
    }

    pub async fn check_wait(&mut self) -> Result<(), Error> {
        self.wait().await?.check_status()
    }

    /// Drains both output pipes, then waits for the exit status. The pipes
    /// are read concurrently so neither can fill up and stall the process.
    pub async fn wait_with_output(mut self) -> Result<CommandOutput, Error> {
        let mut stdout_pipe = self.child.stdout.take();
        let mut stderr_pipe = self.child.stderr.take();
        let (stdout, stderr) =
            tokio::join!(read_pipe(&mut stdout_pipe), read_pipe(&mut stderr_pipe));
        let stdout = stdout.map_err(Error::SubprocessIoError)?;
        let stderr = stderr.map_err(Error::SubprocessIoError)?;
        let status = self.wait().await?;
        Ok(CommandOutput {
            status,
            stdout,
            stderr,
        })
    }
}
