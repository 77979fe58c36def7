//! Error types for fogger-store.

use std::path::PathBuf;

/// Result type for fogger-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fogger-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored row could not be turned back into an event.
    #[error("Corrupt event #{id}: {reason}")]
    CorruptEvent { id: i64, reason: String },

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
