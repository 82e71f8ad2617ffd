//! Local process execution

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub retval: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, retval: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            retval,
        }
    }

    pub fn success(&self) -> bool {
        self.retval == 0
    }

    /// stderr and stdout joined, for use as a failure reason
    pub fn joined_output(&self) -> String {
        [self.stderr.trim(), self.stdout.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs local commands.
///
/// A non-zero exit code is not an error at this level; callers inspect
/// [`CommandOutput::retval`]. Errors are reserved for failing to run at all.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    /// Upper bound for a single command
    timeout: Duration,
    /// Environment passed to every child (the parent environment is not inherited)
    env: BTreeMap<String, String>,
}

impl TokioCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        let mut env = BTreeMap::new();
        env.insert("LC_ALL".to_string(), "C".to_string());
        Self { timeout, env }
    }

    /// Add an environment variable for every spawned command
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[async_trait::async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Error::Internal("cannot run an empty command".into()))?;
        let command_line = args.join(" ");

        tracing::debug!("Running: {}", command_line);

        let mut command = Command::new(program);
        command
            .args(rest)
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::Command {
                    command: command_line,
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(Error::CommandTimeout(command_line)),
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            retval: output.status.code().unwrap_or(-1),
        };

        tracing::debug!("Finished: {} (retval {})", command_line, result.retval);
        Ok(result)
    }
}
