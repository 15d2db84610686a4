//! Admin user listing.

use serde::Serialize;
use std::sync::Arc;

use super::{Output, json, require_user};
use crate::access::Gate;
use crate::models::User;
use crate::{Error, Result, Taskflow};

/// Result of `tf user list`.
#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Arc<Vec<User>>,
}

impl Output for UserList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.users.is_empty() {
            return "No users found".to_string();
        }
        let mut lines = vec![format!("{} user(s):", self.users.len())];
        for user in self.users.iter() {
            let joined = user
                .created_at
                .map(|at| format!(" (joined {})", at.format("%Y-%m-%d")))
                .unwrap_or_default();
            lines.push(format!(
                "  #{} {} [{}]{}",
                user.id,
                user.email,
                user.role.as_str().to_lowercase(),
                joined
            ));
        }
        lines.join("\n")
    }
}

/// Non-admins are turned away before any request is made.
pub async fn list(app: &Taskflow) -> Result<UserList> {
    require_user(app).await?;
    match app.users_view().await? {
        Gate::Granted(users) => Ok(UserList { users }),
        Gate::AccessDenied => Err(Error::AccessDenied(
            "the user list is only available to administrators".to_string(),
        )),
    }
}
