use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quire_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Item ID cannot be empty")]
    EmptyItemId,
    #[error("Item not found for id/prefix: {0}")]
    ItemNotFound(String),
    #[error("{0}")]
    AmbiguousItemId(String),
    #[error("Edited content cannot be empty")]
    EmptyEditedContent,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No remote is configured. Run `quire remote add <name> dir <path>` first.")]
    NoRemotes,
}
