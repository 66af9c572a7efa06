use cove_shared::CoveError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (database directory, object files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A document or object that was expected to exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored document body is not a JSON object.
    #[error("Corrupt document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored document body has the wrong shape.
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// A previous holder of the connection lock panicked.
    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Object too large: {size} bytes (max {max})")]
    ObjectTooLarge { size: usize, max: usize },

    #[error("Empty object")]
    EmptyObject,

    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

impl From<StoreError> for CoveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => CoveError::NotFound(what),
            StoreError::ObjectTooLarge { .. } | StoreError::EmptyObject | StoreError::InvalidPath(_) => {
                CoveError::Validation(e.to_string())
            }
            StoreError::Json(_) | StoreError::CorruptDocument(_) => CoveError::Malformed(e.to_string()),
            other => CoveError::ServiceUnavailable(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
