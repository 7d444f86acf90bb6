//! Shell command execution with timeout and bounded retry.
//!
//! Every external CLI (ionosctl, replicated, kubectl, helm, git, ...) is
//! driven through the [`CommandRunner`] trait so the provider drivers can be
//! exercised against scripted output in tests.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Exit code reported when a command was killed after its timeout.
pub const EXIT_CODE_TIMEOUT: i32 = -1;

/// Shell used to interpret commands.
const SHELL: &str = "/bin/bash";

/// A command returned a non-zero exit code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{description} failed with exit code {exit_code}: {}", output.join("\n"))]
pub struct CommandError {
    /// Short description of the command.
    pub description: String,
    /// Exit code of the last attempt.
    pub exit_code: i32,
    /// Captured error output (or the timeout diagnostic).
    pub output: Vec<String>,
}

/// Result of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, or [`EXIT_CODE_TIMEOUT`].
    pub exit_code: i32,
    /// Trimmed stdout lines on success, trimmed stderr lines on failure.
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// Successful output with the given lines.
    #[must_use]
    pub fn ok<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            exit_code: 0,
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }

    /// Failed output with the given exit code and lines.
    #[must_use]
    pub fn failed<S: AsRef<str>>(exit_code: i32, lines: &[S]) -> Self {
        Self {
            exit_code,
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert into the output lines, or a [`CommandError`] on failure.
    ///
    /// # Errors
    /// Returns an error if the exit code is non-zero.
    pub fn into_result(self, description: &str) -> Result<Vec<String>, CommandError> {
        if self.success() {
            Ok(self.lines)
        } else {
            Err(CommandError {
                description: description.to_string(),
                exit_code: self.exit_code,
                output: self.lines,
            })
        }
    }
}

/// Timeout and retry settings for a single [`CommandRunner::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Time after which an attempt is killed.
    pub timeout: Duration,
    /// Total number of attempts.
    pub retries: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retries: 1,
            delay: Duration::from_secs(60),
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.delay = delay;
        self
    }
}

/// Executes shell commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`, retrying on non-zero exit as configured by `opts`.
    ///
    /// The result of the last attempt is returned.
    async fn run(&self, command: &str, description: &str, opts: &RunOptions) -> CommandOutput;

    /// Run `command` without a timeout, its output going straight to ours.
    ///
    /// Returns the exit code, or [`EXIT_CODE_TIMEOUT`] if the shell could
    /// not be run or was killed.
    async fn stream(&self, command: &str) -> i32;
}

/// [`CommandRunner`] spawning `/bin/bash -c <command>`.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    /// Environment variables set on every spawned process.
    env: Vec<(String, String)>,
}

impl ShellRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every spawned process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    async fn run_once(&self, command: &str, description: &str, timeout: Duration) -> CommandOutput {
        let child = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::failed(
                    EXIT_CODE_TIMEOUT,
                    &[format!("{description} could not be started: {e}")],
                );
            }
        };

        // Dropping the future on timeout kills the child (kill_on_drop).
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(%description, timeout_secs = timeout.as_secs(), "Command timed out");
                CommandOutput::failed(
                    EXIT_CODE_TIMEOUT,
                    &[format!(
                        "{description} timed out after {} seconds.",
                        timeout.as_secs()
                    )],
                )
            }
            Ok(Err(e)) => CommandOutput::failed(
                EXIT_CODE_TIMEOUT,
                &[format!("{description} could not be awaited: {e}")],
            ),
            Ok(Ok(output)) => {
                if output.status.success() {
                    CommandOutput {
                        exit_code: 0,
                        lines: output_to_lines(&output.stdout),
                    }
                } else {
                    CommandOutput {
                        // Killed by a signal: no code, report like a timeout.
                        exit_code: output.status.code().unwrap_or(EXIT_CODE_TIMEOUT),
                        lines: output_to_lines(&output.stderr),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, description: &str, opts: &RunOptions) -> CommandOutput {
        let attempts = opts.retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%description, attempt, attempts, "Running command");
            let output = self.run_once(command, description, opts.timeout).await;

            if output.success() || attempt >= attempts {
                return output;
            }

            warn!(
                %description,
                exit_code = output.exit_code,
                "Command failed (attempt {attempt}/{attempts}). Retrying in {:?}...",
                opts.delay
            );
            tokio::time::sleep(opts.delay).await;
        }
    }

    async fn stream(&self, command: &str) -> i32 {
        let status = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.code().unwrap_or(EXIT_CODE_TIMEOUT),
            Err(e) => {
                error!(error = %e, "Failed to run streaming command");
                EXIT_CODE_TIMEOUT
            }
        }
    }
}

/// Split raw process output into trimmed lines.
#[must_use]
pub fn output_to_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}
