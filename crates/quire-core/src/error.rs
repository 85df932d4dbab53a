//! Error types for quire-core

use thiserror::Error;

/// Result type alias using quire-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quire-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A storage driver was used before it was configured
    #[error("Storage driver '{0}' is not configured")]
    NotConfigured(String),

    /// Remote storage error (push, pull, delete)
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
