//! TaskFlow - client core for a remote project and task management API.
//!
//! This library provides the core functionality for the `tf` CLI tool:
//! session handling with transparent token refresh, a query cache with
//! typed invalidation, and role-based view selection.

pub mod access;
pub mod api;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod http;
pub mod logging;
pub mod models;
pub mod notify;
pub mod query;
pub mod session;

/// In-process fake API for library tests.
#[cfg(test)]
pub(crate) mod test_utils;

pub use client::Taskflow;

use http::ApiError;

/// Library-level error type for TaskFlow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A write failed; `action` is the user-facing description
    #[error("{action}: {source}")]
    Mutation {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Not logged in: run `tf login` first")]
    NotLoggedIn,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The API error behind this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) | Error::Mutation { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// True when the user has to sign in (again) before retrying.
    pub fn needs_login(&self) -> bool {
        matches!(self, Error::NotLoggedIn) || self.api_error().is_some_and(ApiError::is_auth)
    }
}

/// Result type alias for TaskFlow operations.
pub type Result<T> = std::result::Result<T, Error>;
