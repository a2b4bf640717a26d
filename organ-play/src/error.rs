//! Error types for organ-play
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for organ-play
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared common crate (config loading, settings validation)
    #[error(transparent)]
    Common(#[from] organ_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Score sheet could not be parsed
    #[error("Score parse error: {0}")]
    ScoreParse(#[from] toml::de::Error),

    /// Score metadata violates a playback precondition
    #[error("Invalid score: {0}")]
    InvalidScore(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Playback engine errors
    #[error("Playback engine error: {0}")]
    Engine(String),
}

/// Convenience Result type using organ-play Error
pub type Result<T> = std::result::Result<T, Error>;
