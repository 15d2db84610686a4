//! Errors surfaced by the request layer.

use serde::Deserialize;
use thiserror::Error;

use super::ApiResponse;

/// Errors that can occur while talking to the remote API.
///
/// `Clone` so that a single in-flight fetch can hand its outcome to every
/// waiter sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 401 that was not resolved by a token refresh
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The refresh endpoint rejected the ambient credential; the session was cleared
    #[error("Session expired, please log in again: {0}")]
    AuthenticationFailed(String),

    /// 4xx with a message payload (bad input, conflicts)
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// 403 Forbidden
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// 404 Not Found
    #[error("Not found: {0}")]
    NotFound(String),

    /// 5xx or any other unexpected status
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("Failed to parse API response: {0}")]
    Decode(String),
}

/// How a front end should present an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Show next to the offending input; not fatal
    Inline,
    /// Page-level "access denied" / "not found" state
    AccessDenied,
    /// Transient failure notification; the operation is not retried
    Transient,
    /// Send the user back to the login screen
    Relogin,
}

impl ApiError {
    /// Map a non-success response to its error variant.
    pub fn from_response(response: &ApiResponse) -> Self {
        let message = response
            .error_message()
            .unwrap_or_else(|| default_reason(response.status).to_string());

        match response.status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            400..=499 => ApiError::Validation {
                status: response.status,
                message,
            },
            status => ApiError::Server { status, message },
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            ApiError::Validation { .. } => Presentation::Inline,
            ApiError::Forbidden(_) | ApiError::NotFound(_) => Presentation::AccessDenied,
            ApiError::Server { .. } | ApiError::Network(_) | ApiError::Decode(_) => {
                Presentation::Transient
            }
            ApiError::Unauthorized(_) | ApiError::AuthenticationFailed(_) => Presentation::Relogin,
        }
    }

    /// True for errors that mean the user has to sign in again.
    pub fn is_auth(&self) -> bool {
        self.presentation() == Presentation::Relogin
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::AuthenticationFailed(_) | ApiError::Network(_) | ApiError::Decode(_) => {
                None
            }
        }
    }

    /// The bare server message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::AuthenticationFailed(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Network(m)
            | ApiError::Decode(m) => m,
            ApiError::Validation { message, .. } | ApiError::Server { message, .. } => message,
        }
    }
}

/// Error payload shape: `{"message": "..."}` or `{"message": ["...", "..."]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        match self.message? {
            ErrorMessage::One(message) if !message.is_empty() => Some(message),
            ErrorMessage::One(_) => None,
            ErrorMessage::Many(messages) if !messages.is_empty() => Some(messages.join("; ")),
            ErrorMessage::Many(_) => None,
        }
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unexpected response",
    }
}
