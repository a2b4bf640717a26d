//! # Organ Play Common Library
//!
//! Shared code for the organ-play crates including:
//! - Error types
//! - Configuration loading
//! - Human-readable display formatting

pub mod config;
pub mod error;
pub mod human_time;

pub use config::{ConfigResolver, PlaybackSettings, TomlConfig};
pub use error::{Error, Result};
