//! Discovery of the bondlink CLI executable.
//!
//! The daemon installs its CLI in a small set of well-known locations;
//! the `BONDLINK_CLI` environment variable overrides the probe for
//! development builds and nonstandard installs. The resolved path is
//! owned by whichever [`Client`](crate::client::Client) it is handed to —
//! there is no process-wide cache.

use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Environment variable that overrides the CLI search path.
pub const CLI_ENV_VAR: &str = "BONDLINK_CLI";

const INSTALL_PATHS: &[&str] = &[
    "/Applications/Bondlink.app/Contents/Resources/bondlink_cli",
    "C:\\Program Files (x86)\\Bondlink\\bondlink_cli.exe",
    "C:\\Program Files\\Bondlink\\bondlink_cli.exe",
    "/usr/share/bondlink/bondlink_cli",
];

/// Find the CLI executable, preferring the `BONDLINK_CLI` override.
pub fn locate_cli() -> Result<PathBuf, CliError> {
    if let Ok(possible) = std::env::var(CLI_ENV_VAR) {
        if !possible.is_empty() {
            let path = PathBuf::from(&possible);
            if path.is_file() {
                tracing::debug!("using CLI from {CLI_ENV_VAR} ({possible})");
                return Ok(path);
            }
            tracing::warn!("{CLI_ENV_VAR} specified a nonexistent path to the CLI: {possible:?}");
        }
    }
    for candidate in INSTALL_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            tracing::debug!("using CLI at ({candidate})");
            return Ok(path.to_path_buf());
        }
    }
    tracing::error!("could not find bondlink_cli");
    Err(CliError::CliNotFound)
}
