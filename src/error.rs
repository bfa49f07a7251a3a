//! Error types for the timecode reader

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Timecode error: {0}")]
    Timecode(#[from] TimecodeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Buffer overflow")]
    BufferOverflow,
}

/// Malformed timecode values and strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimecodeError {
    #[error("{field} out of range: {value} (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("Cannot parse timecode: {0}")]
    Parse(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
