use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};

use super::framing::RecordFramer;
use crate::command::CliCommand;
use crate::error::CliError;

/// Caller-supplied sink for parsed records.
///
/// Implemented for any `FnMut(Value) -> anyhow::Result<()>` closure. A
/// failure returned from the handler is logged and the session moves on
/// to the next record; one bad invocation never ends the stream.
#[async_trait]
pub trait RecordHandler: Send {
    async fn on_record(&mut self, record: Value) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> RecordHandler for F
where
    F: FnMut(Value) -> anyhow::Result<()> + Send,
{
    async fn on_record(&mut self, record: Value) -> anyhow::Result<()> {
        (self)(record)
    }
}

/// Forwards records to an mpsc channel, for callers that would rather
/// consume the stream as a queue than supply a callback.
pub struct ChannelHandler {
    sender: mpsc::Sender<Value>,
}

impl ChannelHandler {
    pub fn new(sender: mpsc::Sender<Value>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl RecordHandler for ChannelHandler {
    async fn on_record(&mut self, record: Value) -> anyhow::Result<()> {
        self.sender
            .send(record)
            .await
            .map_err(|e| anyhow::anyhow!("record receiver dropped: {e}"))
    }
}

/// Terminates the child process of a running [`StreamingReader`].
///
/// Cancellation is out-of-band: killing the child closes its stdout, the
/// reader observes EOF and returns through its normal final-flush path.
#[derive(Clone)]
pub struct CancelHandle {
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.notify.notify_one();
    }
}

/// Launches a CLI streaming command and feeds the caller a live, ordered
/// sequence of parsed JSON records for the lifetime of the subprocess.
///
/// One reader owns one subprocess and one accumulation buffer; run
/// concurrent sessions by constructing independent readers.
pub struct StreamingReader {
    command: CliCommand,
    cancel: Arc<Notify>,
}

impl StreamingReader {
    pub fn new(command: CliCommand) -> Self {
        Self {
            command,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn command(&self) -> &CliCommand {
        &self.command
    }

    /// Handle for terminating the session early; grab it before calling
    /// [`StreamingReader::run`].
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            notify: Arc::clone(&self.cancel),
        }
    }

    /// Launch the CLI and dispatch every framed record to `handler`,
    /// returning once the child has exited and its stdout reached EOF.
    ///
    /// The only failure surfaced here is the inability to launch the
    /// subprocess. Malformed records and handler failures are logged and
    /// skipped; a nonzero child exit after streaming is logged, and every
    /// record parsed before it stays delivered.
    pub async fn run<H>(self, handler: &mut H) -> Result<(), CliError>
    where
        H: RecordHandler + ?Sized,
    {
        tracing::debug!("streaming {}", self.command.display());

        let mut child = tokio::process::Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            // stderr stays attached to the parent for diagnostics
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CliError::Launch {
                program: self.command.program.display().to_string(),
                source: e,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CliError::UnexpectedResponse("child stdout was not captured".to_string())
        })?;
        let mut lines = BufReader::new(stdout).lines();
        let mut framer = RecordFramer::new();
        let mut killed = false;

        loop {
            tokio::select! {
                _ = self.cancel.notified(), if !killed => {
                    tracing::debug!("cancelling {}", self.command.display());
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("failed to kill streaming child: {e}");
                    }
                    killed = true;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(text) = framer.push_line(&line) {
                            dispatch(&text, handler).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("read error on CLI stdout, treating as end of stream: {e}");
                        break;
                    }
                },
            }
        }

        // some commands skip the blank line after their final record
        if let Some(text) = framer.finish() {
            dispatch(&text, handler).await;
        }

        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::debug!("{} exited with {status}", self.command.display());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("failed to reap streaming child: {e}"),
        }
        Ok(())
    }
}

/// Parse one framed record and hand it to the handler. Both parse
/// failures and handler failures are contained here; neither may end the
/// streaming session.
async fn dispatch<H>(text: &str, handler: &mut H)
where
    H: RecordHandler + ?Sized,
{
    let record: Value = match serde_json::from_str(text) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("skipping record that failed to parse: {e}");
            return;
        }
    };
    if let Err(e) = handler.on_record(record).await {
        tracing::warn!("record handler failed: {e}");
    }
}
