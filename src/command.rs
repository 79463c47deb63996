use std::path::{Path, PathBuf};
use std::time::Duration;

/// One invocation of the CLI: executable path, ordered arguments, and an
/// optional wall-clock cap enforced by the single-shot runner.
///
/// Streaming commands carry no timeout; their duration is controlled by
/// the CLI argument itself (`stats <seconds>`, 0 meaning forever) or by a
/// [`CancelHandle`](crate::stream::CancelHandle).
#[derive(Debug, Clone)]
pub struct CliCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CliCommand {
    pub(crate) fn display(&self) -> String {
        format!("{} {}", self.program.display(), self.args.join(" "))
    }
}

/// Builder for [`CliCommand`].
pub struct CliCommandBuilder {
    command: CliCommand,
}

impl CliCommandBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            command: CliCommand {
                program: program.as_ref().to_path_buf(),
                args: Vec::new(),
                timeout: None,
            },
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.command.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> CliCommand {
        self.command
    }
}
