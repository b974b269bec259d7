//! Error and result types shared across the crate.
//!
//! Two families live here: [`ValidationError`] for client-side field rules
//! (handled at the cell editor and dialog boundary, never sent over the
//! wire) and [`ApiError`] for any backend operation that did not succeed.
use thiserror::Error;

/// A field value rejected by a client-side rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("role ID may only contain letters and digits")]
    InvalidIdentifier,
    #[error("full name must not be empty")]
    EmptyFullName,
    #[error("user ID may only contain digits")]
    InvalidUserId,
}

/// Failure of a single backend operation.
///
/// The reconciliation core treats every variant the same way; the
/// distinction only matters for log output and dialog messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request could not be completed (connect, TLS, IO).
    #[error("request failed: {0}")]
    Transport(String),
    /// The server answered with a non-success HTTP status.
    #[error("server returned HTTP {0}")]
    Status(u16),
    /// The server answered `{"success": false}`.
    #[error("{}", message.as_deref().unwrap_or("operation rejected by server"))]
    Rejected { message: Option<String> },
    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Server-provided message, if the server sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Parse(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
