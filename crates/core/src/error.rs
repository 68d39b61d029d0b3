//! Error taxonomy for the token/session lifecycle.

use thiserror::Error;

/// Result type used across the session layer.
pub type AuthResult<T> = Result<T, AuthError>;

/// Session-level error.
///
/// Only login and refresh failures are expected to reach callers; codec and
/// storage failures are converted to `false`/`None` at their boundaries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is not a decodable three-segment token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The backend rejected the refresh, or the call failed in transit.
    #[error("token refresh failed: {0}")]
    RefreshFailure(String),

    /// Bad credentials, network failure, or a login response without a token.
    #[error("login failed: {0}")]
    LoginFailure(String),

    /// Backing storage could not be read or written.
    #[error("session storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl AuthError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedToken(msg.into())
    }

    pub fn refresh(msg: impl Into<String>) -> Self {
        Self::RefreshFailure(msg.into())
    }

    pub fn login(msg: impl Into<String>) -> Self {
        Self::LoginFailure(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }
}
