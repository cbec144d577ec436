//! Client error types.

use superset_layout::LayoutError;
use thiserror::Error;

/// Errors returned by the Superset client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The dashboard layout rejected an edit.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The object must be saved on the server first.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A lookup matched nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lookup that should match once matched several objects.
    #[error("multiple objects found: {0}")]
    MultipleFound(String),

    /// Malformed request or response body.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Login or token refresh failed.
    #[error("authentication error: {0}")]
    Auth(String),
}

impl ClientError {
    /// HTTP status of an [`ClientError::Api`] error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the object as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
