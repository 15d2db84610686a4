//! Command implementations for the `tf` CLI.
//!
//! Each submodule returns a result struct implementing [`Output`]; `main`
//! decides between JSON and human rendering.
//! - `auth` - login, register, logout, whoami
//! - `dashboard` - recent projects and statistics
//! - `projects` / `tasks` - listing, details and mutations
//! - `users` - admin user listing
//! - `config` - show and edit `config.kdl`

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod projects;
pub mod tasks;
pub mod users;

use serde::Serialize;

use crate::models::User;
use crate::notify::Notice;
use crate::query::{Mutation, MutationOutcome};
use crate::{Error, Result, Taskflow};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Compact JSON for a serializable result; falls back to an error object.
pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// The signed-in user, or `NotLoggedIn` when the session could not be restored.
pub async fn require_user(app: &Taskflow) -> Result<User> {
    match app.current_user() {
        Some(user) => Ok(user),
        None => app.restore().await.ok_or(Error::NotLoggedIn),
    }
}

/// Run a mutation through the query client and pick up the notice it
/// published.
pub(crate) async fn mutate(app: &Taskflow, mutation: Mutation) -> Result<(MutationOutcome, Notice)> {
    let action = mutation.failure_action();
    match app.query().mutate(mutation.clone()).await {
        Ok(outcome) => {
            let notice = app
                .query()
                .notices()
                .latest()
                .filter(|n| !n.is_error())
                .unwrap_or_else(|| Notice::success(mutation.success_message(&outcome)));
            Ok((outcome, notice))
        }
        Err(source) => Err(Error::Mutation { action, source }),
    }
}

/// `"<email>"` or `"-"` for an optional assignee.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
