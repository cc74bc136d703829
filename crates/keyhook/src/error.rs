//! Error handling for the keyhook crate.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for keyhook operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while checking or replaying a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The scenario file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The scenario file is not valid RON for a scenario.
    #[error("failed to parse scenario: {0}")]
    Parse(String),
    /// The scenario parsed but is inconsistent.
    #[error("invalid scenario: {0}")]
    Invalid(String),
    /// Errors surfaced by the keybinds core.
    #[error(transparent)]
    Keybinds(#[from] keybinds::Error),
    /// JSON serialization failed.
    #[error("failed to serialize scenario: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Helper for scenario validation failures.
    pub fn invalid<M: Into<String>>(msg: M) -> Self {
        Self::Invalid(msg.into())
    }
}
