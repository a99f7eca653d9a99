//! Product request errors

/// Errors from product requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No seller identity is available for a seller-scoped request.
    #[error("not authenticated: no seller identity")]
    NotAuthenticated,

    /// The backend rejected the credential even after a refresh.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Backend {
        status: u16,
        /// `message` field of the error body, when there is one
        message: Option<String>,
    },

    /// No usable response: connection failure, timeout or undecodable body.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias for product operations.
pub type Result<T> = std::result::Result<T, Error>;
