//! Application error types for storage, validation and import.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The candidate range intersects an existing flag of the same document.
    #[error("Flag [{start}, {end}) overlaps existing flag {existing_id} [{existing_start}, {existing_end})")]
    Overlap {
        start: usize,
        end: usize,
        existing_id: u64,
        existing_start: usize,
        existing_end: usize,
    },

    /// A bulk-import row could not be parsed or validated.
    #[error("Import row {row}: {message}")]
    Format { row: usize, message: String },

    #[error("Document markup could not be parsed: {0}")]
    Html(String),

    #[error("Internal server error")]
    Internal,
}

impl From<redb::DatabaseError> for AppError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for AppError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for AppError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for AppError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for AppError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}
