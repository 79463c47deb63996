//! Scripted [`ProcessRunner`] for exercising the client without a daemon.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::command::CliCommand;
use crate::error::CliError;
use crate::runner::{ExitStatus, ProcessOutput, ProcessRunner};

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

struct MockResponse {
    args_matcher: Option<ArgsMatcher>,
    output: ProcessOutput,
}

/// A process runner that replays canned responses and records every
/// command it was handed.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    call_history: Arc<Mutex<Vec<CliCommand>>>,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin scripting one response; finish with
    /// [`MockResponseBuilder::finish`].
    pub fn expect(&self) -> MockResponseBuilder {
        MockResponseBuilder {
            runner: self.clone(),
            response: MockResponse {
                args_matcher: None,
                output: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(1),
                },
            },
        }
    }

    /// Every command handed to the runner so far, in call order.
    pub fn calls(&self) -> Vec<CliCommand> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: CliCommand) -> Result<ProcessOutput, CliError> {
        self.call_history.lock().unwrap().push(command.clone());

        let responses = self.responses.lock().unwrap();
        for response in responses.iter() {
            if let Some(matcher) = &response.args_matcher {
                if !matcher(&command.args) {
                    continue;
                }
            }
            return Ok(response.output.clone());
        }
        Err(CliError::UnexpectedResponse(format!(
            "no mock response scripted for args {:?}",
            command.args
        )))
    }
}

/// Builder returned by [`MockProcessRunner::expect`].
pub struct MockResponseBuilder {
    runner: MockProcessRunner,
    response: MockResponse,
}

impl MockResponseBuilder {
    /// Restrict this response to commands whose args satisfy `matcher`.
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.response.args_matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.response.output.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.response.output.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.response.output.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn finish(self) {
        self.runner
            .responses
            .lock()
            .unwrap()
            .push(self.response);
    }
}
