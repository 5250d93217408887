use thiserror::Error;

/// Errors that can be returned by parlor-client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An HTTP request failed (network error, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body had an unexpected shape.
    #[error("invalid server response: {0}")]
    InvalidResponse(String),
}
