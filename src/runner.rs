//! Single-shot subprocess execution.
//!
//! Every non-streaming CLI operation goes through [`ProcessRunner::run`]:
//! spawn, wait for completion (with an optional timeout), capture both
//! output streams. The long-running streaming path lives in
//! [`crate::stream`] and owns its child process directly.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::command::CliCommand;
use crate::error::CliError;

/// Final exit disposition of a completed CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }
}

/// Captured output of a completed CLI run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Seam between the client and the operating system, so tests can script
/// CLI responses without a daemon installed.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion, capturing stdout and stderr.
    async fn run(&self, command: CliCommand) -> Result<ProcessOutput, CliError>;
}

/// The production runner, backed by `tokio::process`.
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: CliCommand) -> Result<ProcessOutput, CliError> {
        let start = Instant::now();
        tracing::debug!("running {}", command.display());

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| CliError::Launch {
            program: command.program.display().to_string(),
            source: e,
        })?;

        let output = match command.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    // kill_on_drop reaps the abandoned child
                    tracing::warn!("{} timed out after {limit:?}", command.display());
                    return Err(CliError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await?,
        };

        let result = ProcessOutput {
            status: convert_exit_status(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        };
        log_result(&result, &command);
        Ok(result)
    }
}

fn convert_exit_status(status: std::process::ExitStatus) -> ExitStatus {
    if status.success() {
        ExitStatus::Success
    } else if let Some(code) = status.code() {
        ExitStatus::Error(code)
    } else {
        signal_status(status)
    }
}

#[cfg(unix)]
fn signal_status(status: std::process::ExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => ExitStatus::Signal(signal),
        None => ExitStatus::Error(-1),
    }
}

#[cfg(not(unix))]
fn signal_status(_status: std::process::ExitStatus) -> ExitStatus {
    ExitStatus::Error(-1)
}

fn log_result(result: &ProcessOutput, command: &CliCommand) {
    match &result.status {
        ExitStatus::Success => {
            tracing::debug!(
                "{} completed in {:?} ({} bytes out)",
                command.display(),
                result.duration,
                result.stdout.len()
            );
        }
        ExitStatus::Error(code) => {
            tracing::debug!(
                "{} failed with exit code {code} in {:?}",
                command.display(),
                result.duration
            );
            if !result.stderr.is_empty() {
                tracing::trace!("stderr: {}", result.stderr);
            }
        }
        ExitStatus::Signal(signal) => {
            tracing::warn!("{} terminated by signal {signal}", command.display());
        }
    }
}
