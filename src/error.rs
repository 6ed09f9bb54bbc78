//! Centralized error types for jira-cli.
//!
//! This module aggregates the API and configuration errors into the one type
//! the command layer returns, and turns them into user-facing messages.

use thiserror::Error;

use crate::api::{ApiError, ErrorKind};
use crate::config::ConfigError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (reading stdin, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line input.
    #[error("{0}")]
    Usage(String),
}

impl AppError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        AppError::Usage(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file is readable."
                        .to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
            },
            AppError::Api(e) => match e {
                ApiError::MissingCredentials(msg) => format!("No usable credentials: {}.", msg),
                ApiError::Unauthorized { status: 403, .. } => {
                    "Access denied. You don't have permission to access this resource.".to_string()
                }
                ApiError::Unauthorized { .. } => {
                    "Authentication failed. Please check your JIRA token.".to_string()
                }
                ApiError::NotFound(what) => format!("Not found: {}", what),
                ApiError::Validation { message, .. } => format!("JIRA rejected the request: {}", message),
                ApiError::InvalidInput(msg) => format!("Invalid input: {}", msg),
                ApiError::ServerError { status, message } => {
                    format!("JIRA server error (HTTP {}): {}", status, message)
                }
                ApiError::Network(detail) => format!("Connection failed: {}", detail),
                ApiError::InvalidUrl(_) => "Invalid JIRA URL.".to_string(),
                ApiError::Keyring(_) => {
                    "Could not access the system credential store.".to_string()
                }
                ApiError::InvalidResponse(_) => {
                    "Unexpected response from JIRA. Please try again.".to_string()
                }
                ApiError::Unexpected { status, message } => {
                    format!("JIRA returned HTTP {}: {}", status, message)
                }
            },
            AppError::Io(_) => "A file or terminal operation failed.".to_string(),
            AppError::Usage(msg) => msg.clone(),
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Api(e) => match e.kind() {
                ErrorKind::Auth => {
                    Some("Run 'jira auth login' or set JIRA_URL and JIRA_TOKEN.")
                }
                ErrorKind::Network => Some(
                    "Check your internet connection and JIRA URL. Use --no-verify-ssl for self-signed certificates.",
                ),
                ErrorKind::ServerError => Some("Wait a moment and try again."),
                _ => None,
            },
            AppError::Config(_) => Some("Fix or remove the jira-cli config.toml file."),
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
