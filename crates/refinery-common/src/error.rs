//! Error types shared by the refinery crates

use thiserror::Error;

/// Result type alias for refinery operations
pub type Result<T> = std::result::Result<T, RefineryError>;

/// Main error type for refinery plumbing (configuration, files, serialization)
#[derive(Error, Debug)]
pub enum RefineryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RefineryError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        RefineryError::Config(msg.into())
    }
}
