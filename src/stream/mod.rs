//! Streaming command reader.
//!
//! The CLI's long-running commands (`stats <seconds>`, `safebrowsing
//! errors <seconds>`) emit JSON records over stdout indefinitely, one
//! fragment per line with a blank line terminating each logical record.
//! This module frames that stream, parses each record, and dispatches it
//! to a caller-supplied handler — in strict arrival order, exactly once,
//! without letting a malformed record or a failing handler end the
//! session.

mod framing;
mod reader;

pub use framing::RecordFramer;
pub use reader::{CancelHandle, ChannelHandler, RecordHandler, StreamingReader};
