//! Common error types for organ-play crates

use thiserror::Error;

/// Common result type for organ-play operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the player crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML document (wraps toml::de::Error)
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or option value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
