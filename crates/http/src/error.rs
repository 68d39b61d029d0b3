use reqwest::StatusCode;
use thiserror::Error;

use bankflow_core::AuthError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request could not be built (e.g. a header value with control characters).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Token refresh failed while recovering from a 401.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
