use crate::storage::StorageError;
use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of error body characters kept in an error message.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Unable to reach the server: {0}")]
    Transport(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: StatusCode, message: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),
    #[error("Session refresh ended without settling this call")]
    RefreshAbandoned,
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// True for errors that mean the session is unusable.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::RefreshFailed(_) | ApiError::RefreshAbandoned
        )
    }
}

/// Maps reqwest failures into transport or timeout errors.
pub(crate) fn map_request_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(format!("Request timed out: {err}"))
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Trims and truncates error bodies before they end up in messages or logs.
pub(crate) fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
