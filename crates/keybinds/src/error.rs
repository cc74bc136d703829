//! Error types and result alias for the keybinds crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
///
/// None of these ever reach the host: the hook shim logs them and falls back
/// to letting the original input handler run.
#[derive(Error, Debug)]
pub enum Error {
    /// The native input handler could not be located in the host image.
    #[error("Pattern for {name} not found")]
    PatternNotFound {
        /// Name of the hooked function.
        name: String,
    },
    /// The hook has already been installed.
    #[error("Hook {name} is already installed")]
    AlreadyInstalled {
        /// Name of the hooked function.
        name: String,
    },
    /// The detour installer rejected the target.
    #[error("Failed to install detour for {name}: {reason}")]
    Detour {
        /// Name of the hooked function.
        name: String,
        /// Installer-provided reason.
        reason: String,
    },
    /// A signature string could not be parsed.
    #[error("Invalid signature: {0}")]
    Pattern(#[from] PatternError),
    /// The environmental guard could not determine host state.
    #[error("Guard check failed: {0}")]
    Guard(String),
    /// The runtime could not represent the event kind for callbacks.
    #[error("Event value conversion failed: {0}")]
    EventValue(String),
}

/// Problems found while parsing a byte signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The signature contained no bytes.
    #[error("signature is empty")]
    Empty,
    /// Hex digits must come in pairs.
    #[error("odd number of digits")]
    OddLength,
    /// A character was neither a hex digit nor `?`.
    #[error("invalid character {0:?} at offset {1}")]
    InvalidChar(char, usize),
    /// `?` must cover a whole byte (`??`).
    #[error("partial wildcard at offset {0}")]
    PartialWildcard(usize),
}
