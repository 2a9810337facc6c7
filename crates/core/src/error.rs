//! Errors returned by external collaborators

use thiserror::Error;

/// Failure of a reply, speech or transcription collaborator call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether resending the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::Timeout(_) => true,
            BackendError::Status { status, .. } => *status >= 500 || *status == 429,
            BackendError::InvalidResponse(_) | BackendError::Unavailable(_) => false,
        }
    }
}
