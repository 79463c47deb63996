use std::time::Duration;

use serde::Deserialize;

/// Error body the daemon prints on stderr when the CLI exits with code 1.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "errorCode")]
    error_code: i64,
    #[serde(rename = "errorType")]
    error_type: String,
    #[serde(rename = "errorMessage")]
    error_message: String,
}

/// The unified error type for the bondlink client library.
///
/// Failures local to streaming record processing (malformed records,
/// handler panics) are never represented here; those are contained and
/// logged inside the reader loop. What does surface is the inability to
/// launch the CLI at all, and the single-shot failure taxonomy derived
/// from the CLI's exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("bondlink CLI not found in any known install location")]
    CliNotFound,

    #[error("failed to launch {program}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("daemon error {error_code} ({error_type}): {error_message}")]
    Api {
        error_code: i64,
        error_type: String,
        error_message: String,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("unknown parameter or command")]
    UnknownParameter,

    #[error("CLI exited with code {code}: {message}")]
    ExitStatus { code: i32, message: String },

    #[error("command {0:?} produced no output")]
    NoOutput(String),

    #[error("unparseable CLI output: {0}")]
    MalformedOutput(String),

    #[error("unexpected value in CLI response: {0}")]
    UnexpectedResponse(String),

    #[error("{0} cannot run with a duration of 0, it would never return")]
    ZeroDuration(&'static str),

    #[error("I/O error talking to the CLI")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Classify a nonzero CLI exit into the library taxonomy.
    ///
    /// Exit codes follow the daemon convention: 1 carries a JSON error body
    /// on stderr (falling back to stdout), 2-4 are argument-level failures
    /// reported as plain text.
    pub(crate) fn from_exit(code: i32, stderr: &str, stdout: &str) -> Self {
        let out = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        match code {
            1 => match serde_json::from_str::<ApiErrorBody>(out) {
                Ok(body) => CliError::Api {
                    error_code: body.error_code,
                    error_type: body.error_type,
                    error_message: body.error_message,
                },
                Err(_) => {
                    tracing::error!("could not parse daemon error body: {out}");
                    CliError::MalformedOutput(out.to_string())
                }
            },
            2 => CliError::InvalidParameter(last_line(out)),
            3 => CliError::MissingParameter(last_line(out)),
            // exit 4 prints the whole usage blob, which helps nobody
            4 => CliError::UnknownParameter,
            _ => CliError::ExitStatus {
                code,
                message: last_line(out),
            },
        }
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
