//! Error types for the session tracking engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    /// Transport-level failure talking to the session API.
    #[error("session API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The session API answered with a non-success status.
    #[error("session API rejected the request (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// A lifecycle command arrived while no lesson session was active.
    #[error("no lesson session is active")]
    NoActiveSession,
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackError>;

impl TrackError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
