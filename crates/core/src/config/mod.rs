//! Configuration loading and validation.

mod loader;
mod types;

pub use loader::*;
pub use types::*;

use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("invalid configuration: {0}")]
    ParseError(String),

    #[error("configuration rejected: {0}")]
    ValidationError(String),
}
