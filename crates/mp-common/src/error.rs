//! Error types shared across the monitoring plugin crates.

use thiserror::Error;

/// Result type alias for monitoring plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for monitoring plugin operations.
///
/// Library crates keep their own specific error enums; this one is what a
/// plugin boundary converts them into before deciding how to exit.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (20-29)
    #[error("configuration error: {0}")]
    Config(String),

    // Command execution errors (30-39)
    #[error("Could not open pipe: {command}")]
    Spawn { command: String },

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("read error on {stream}: {message}")]
    Read { stream: String, message: String },

    #[error("Plugin timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error code for this error type.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 20,
            Error::Spawn { .. } => 30,
            Error::CommandRejected(_) => 31,
            Error::Read { .. } => 32,
            Error::Timeout { .. } => 33,
            Error::Io(_) => 60,
        }
    }
}
