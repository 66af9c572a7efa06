use cove_shared::CoveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LangError {
    #[error("Language service not configured (missing API key)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Language service returned no content")]
    EmptyResponse,
}

impl From<LangError> for CoveError {
    fn from(e: LangError) -> Self {
        CoveError::ServiceUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LangError>;
