//! Error types for file store operations.

use farmboard_core::TaskId;
use thiserror::Error;

/// Errors that can occur during `FileStore` operations.
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// No record with this id exists.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Only ids issued by the store can address stored records.
    #[error("Task {0} has not been saved yet")]
    NotRemote(TaskId),

    /// The board file exists but does not hold a valid board.
    #[error("Failed to parse board file: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Failed to acquire the store lock.
    #[error("Store lock error")]
    LockError,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other unclassified error.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for FileStoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
