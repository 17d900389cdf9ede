//! Generation failures
//!
//! Every variant renders as a message fit to show the user.

use thiserror::Error;

use crate::selection::RequirementHint;

/// The response arrived but did not carry a usable image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    #[error("No candidates in response")]
    NoCandidates,

    #[error("Empty candidates array")]
    EmptyCandidates,

    #[error("No content in candidate")]
    NoContent,

    #[error("No parts in content")]
    NoParts,

    #[error("No image was generated")]
    NoImage,

    #[error("Failed to decode image: {0}")]
    UndecodableImage(String),

    #[error("Unreadable response: {0}")]
    InvalidBody(String),
}

/// Errors from a generation attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Please set your API key in Settings")]
    MissingCredential,

    #[error("Quota exceeded. Get a key from aistudio.google.com")]
    QuotaExceeded,

    #[error("Invalid API key")]
    InvalidCredential,

    #[error("{0}")]
    MalformedResponse(#[from] MalformedResponse),

    #[error("Network error: {0}")]
    TransportFailure(String),

    /// Message from the service's own error envelope
    #[error("{0}")]
    RemoteError(String),

    #[error("Generation cancelled")]
    CancelledByUser,

    #[error("A generation is already in progress")]
    Busy,

    #[error("{}", .0.message())]
    NotReady(RequirementHint),

    #[error("Failed to capture map")]
    MissingSourceImage,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::TransportFailure("request timed out".to_string())
        } else {
            GenerationError::TransportFailure(err.to_string())
        }
    }
}
