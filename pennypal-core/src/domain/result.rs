//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// HTTP failures from the backend are mapped onto the status-specific
/// variants by the API client, so front ends can match on them without
/// knowing about reqwest.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insight error: {0}")]
    Insight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Message suitable for showing to the user, without the variant prefix
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg)
            | Error::Conflict(msg)
            | Error::NotFound(msg)
            | Error::Insight(msg)
            | Error::Other(msg) => msg.clone(),
            Error::Unauthorized(msg) => {
                or_default(msg, "Your session has expired. Please sign in again.")
            }
            Error::Forbidden(msg) => or_default(msg, "You do not have permission to do that."),
            Error::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Error::Server { message, .. } => message.clone(),
            Error::Transport(msg) => {
                or_default(msg, "Unable to reach the PennyPal servers. Check your connection.")
            }
            Error::Session(msg) | Error::Config(msg) => msg.clone(),
            Error::Io(e) => e.to_string(),
            Error::Json(_) => "Received an unexpected response from the server.".to_string(),
        }
    }

    /// True when the error means the stored session is no longer valid
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }
}

fn or_default(msg: &str, default: &str) -> String {
    if msg.trim().is_empty() {
        default.to_string()
    } else {
        msg.to_string()
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.user_message()),
        }
    }
}
