//! # Bondlink
//!
//! Client library for the bondlink bonding-VPN daemon. The daemon itself —
//! multi-path scheduling, encryption, failover — lives behind a separate
//! `bondlink_cli` executable; this crate launches that executable, parses
//! the JSON it emits, and exposes typed convenience methods over it.
//!
//! ```no_run
//! use bondlink::Client;
//!
//! # async fn demo() -> Result<(), bondlink::CliError> {
//! let client = Client::new()?;
//! client.connect_closest().await?;
//! for record in client.stats(5).await? {
//!     println!("{record}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `client` - High-level client: one method per CLI operation
//! - `command` - Command value and builder passed to runners
//! - `error` - Unified error taxonomy and exit-code classification
//! - `locate` - Discovery of the CLI executable on disk
//! - `mock` - Scripted process runner for testing without a daemon
//! - `runner` - Single-shot subprocess execution layer
//! - `stream` - Long-running streaming-command reader (framing + dispatch)
//! - `types` - Daemon-facing enums and record-shape helpers

pub mod client;
pub mod command;
pub mod error;
pub mod locate;
pub mod mock;
pub mod runner;
pub mod stream;
pub mod types;

pub use client::Client;
pub use command::{CliCommand, CliCommandBuilder};
pub use error::CliError;
pub use stream::{CancelHandle, ChannelHandler, RecordFramer, RecordHandler, StreamingReader};
pub use types::{ConnectMethod, ListOp, Mode, Priority, State, Transport};
