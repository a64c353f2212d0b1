//! Error types for scheduler API calls.

use thiserror::Error;

/// Errors returned by one-shot scheduler API calls.
///
/// Nothing here is retried; the caller decides what to do.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection failure, timeout or a broken response stream.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The scheduler answered with a non-success status.
    #[error("scheduler returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A log chunk was not valid base64.
    #[error("invalid log payload: {0}")]
    LogPayload(#[from] base64::DecodeError),

    /// The scheduler address could not be turned into a client.
    #[error("invalid scheduler address '{0}'")]
    InvalidAddress(String),
}

impl ClientError {
    /// Returns the HTTP status if the scheduler answered with an error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for failures below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Reasons an allocation watch ended other than being stopped.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The hardened reconnect policy gave up.
    #[error("watch on job '{job}' gave up after {errors} consecutive errors")]
    TooManyErrors { job: String, errors: u32 },

    /// The scheduler refused the query, e.g. with 404 for an unknown job.
    #[error("watch on job '{job}' rejected: {reason}")]
    Rejected { job: String, reason: String },

    /// The watch task panicked or was aborted.
    #[error("watch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
