//! Custom error types for the asset sync engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Compression error: {0}")]
    Compression(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Why the remote manifest could not be used as the diff baseline.
///
/// Every variant is recoverable: the executor treats the remote state as
/// empty and uploads everything.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("object not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),
}
