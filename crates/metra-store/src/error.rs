//! Error types for metra-store.

use std::path::PathBuf;

use metra_types::ParseError;

/// Result type for metra-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in metra-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// A write violated a relation invariant (unique title, NOT NULL
    /// column). The failed write is rejected; the store stays usable.
    #[error("Constraint violation: {0}")]
    Constraint(rusqlite::Error),

    /// A mutation was attempted through the read-only query surface.
    #[error("Operation not supported on the read-only surface: {0}")]
    UnsupportedOperation(&'static str),

    /// Resource address did not match any recognized shape.
    #[error(transparent)]
    Address(#[from] ParseError),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        // Split the constraint class out so callers can tell an invariant
        // violation from storage being broken.
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Constraint(err)
            }
            _ => Error::Database(err),
        }
    }
}
