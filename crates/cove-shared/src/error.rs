use thiserror::Error;

/// Error taxonomy shared by every Cove crate.
///
/// Backend implementations convert their own failures into one of these
/// variants at the trait boundary, so callers only ever match on this set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoveError {
    #[error("Not signed in")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl CoveError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn unavailable(what: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable(what.to_string())
    }

    pub fn validation(what: impl std::fmt::Display) -> Self {
        Self::Validation(what.to_string())
    }

    pub fn malformed(what: impl std::fmt::Display) -> Self {
        Self::Malformed(what.to_string())
    }
}

impl From<serde_json::Error> for CoveError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoveError>;
