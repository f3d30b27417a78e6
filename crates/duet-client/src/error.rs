//! Client error types.

use thiserror::Error;

/// Errors surfaced to a front end.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, e.g. `not_found`.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// Input rejected before sending.
    #[error("{0}")]
    Validation(String),

    /// An earlier action has not been answered yet.
    #[error("an action is already in flight")]
    SubmissionInFlight,

    /// The server's snapshot does not contain the action that was sent.
    #[error("server snapshot does not confirm the pending action: {0}")]
    Mismatched(String),
}

impl ClientError {
    /// HTTP status of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
