//! Tasks that shell out to an external monitor program.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::process::Command;

use crate::config::{expand_tilde, MonitorSpec};
use crate::{vlog_trace, Error, Result};

use super::{Task, TaskFailure, TaskResult};

/// Runs a collaborator's monitor program once per cycle.
///
/// Exit status 0 is success; anything else is a rejection carrying the
/// program's stderr.
///
/// The child is killed whenever its run future is dropped. With
/// [`CommandTask::with_timeout`] the task enforces the limit itself, so a
/// hung program is killed at the deadline instead of outliving its cycle.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, program: &str, args: Vec<String>) -> Result<Self> {
        let resolved =
            which::which(program).map_err(|_| Error::ProgramNotFound(program.to_string()))?;
        Ok(Self {
            name: name.into(),
            program: resolved,
            args,
            cwd: None,
            timeout: None,
        })
    }

    pub fn from_spec(spec: &MonitorSpec) -> Result<Self> {
        let task = Self::new(spec.name.clone(), &spec.program, spec.args.clone())?;
        Ok(match &spec.cwd {
            Some(dir) => task.with_cwd(expand_tilde(dir)),
            None => task,
        })
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Kill the program and fail as timed out after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    async fn execute(&self) -> TaskResult {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        vlog_trace!("CommandTask {} exec {}", self.name, self.program.display());
        let output = match self.timeout {
            None => cmd.output().await?,
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(output) => output?,
                Err(_) => {
                    vlog_trace!("CommandTask {} killed after {:?}", self.name, limit);
                    return Err(TaskFailure::timed_out(limit));
                }
            },
        };
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        Err(TaskFailure::rejected(reason))
    }
}

impl Task for CommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> BoxFuture<'_, TaskResult> {
        self.execute().boxed()
    }
}
