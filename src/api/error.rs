//! API error types for the JIRA client.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Coarse classification of an [`ApiError`].
///
/// Callers branch on the kind rather than on individual variants, e.g. to decide
/// whether to re-prompt for credentials or to suggest checking the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    NotFound,
    Validation,
    Network,
    ServerError,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::ServerError => "server error",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when talking to the JIRA API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable credentials could be resolved locally.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The server rejected the credentials (401) or denied access (403).
    #[error("Authentication failed (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The server rejected the request payload or query (400/422).
    #[error("Request rejected (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    /// JIRA server error.
    #[error("JIRA server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Transport failure: DNS, connect, TLS handshake or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected locally, before any request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The OS keyring could not be read or written.
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// Invalid response from the API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Any other non-success status.
    #[error("Unexpected HTTP {status}: {message}")]
    Unexpected { status: u16, message: String },
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code and the remote message.
    pub fn from_status(status: StatusCode, message: &str) -> Self {
        let code = status.as_u16();
        let message = message.to_string();
        match code {
            401 | 403 => ApiError::Unauthorized {
                status: code,
                message,
            },
            404 => ApiError::NotFound(message),
            400 | 422 => ApiError::Validation {
                status: code,
                message,
            },
            500..=599 => ApiError::ServerError {
                status: code,
                message,
            },
            _ => ApiError::Unexpected {
                status: code,
                message,
            },
        }
    }

    /// The kind of failure, independent of the concrete variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingCredentials(_) | ApiError::Unauthorized { .. } => ErrorKind::Auth,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Validation { .. } | ApiError::InvalidInput(_) | ApiError::InvalidUrl(_) => {
                ErrorKind::Validation
            }
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::ServerError { .. } => ErrorKind::ServerError,
            ApiError::Keyring(_) | ApiError::InvalidResponse(_) | ApiError::Unexpected { .. } => {
                ErrorKind::Unknown
            }
        }
    }

    /// The HTTP status that produced this error, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::ServerError { status, .. }
            | ApiError::Unexpected { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ApiError::InvalidUrl(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
