//! Error taxonomy for credential and auth-endpoint operations

/// Errors from the auth client and credential substrates.
///
/// The session manager classifies these: `Unauthorized` starts a refresh,
/// `RefreshRejected` tears the session down, `Transport` leaves it alone.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A token was required but none was supplied. Expected, not a fault.
    #[error("unauthenticated: no {0} supplied")]
    MissingCredential(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cached user is corrupt: {0}")]
    CacheCorrupt(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the backend rejected the credential itself.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::RefreshRejected(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
