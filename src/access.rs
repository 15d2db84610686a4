//! Role-based view selection.
//!
//! Everything here decides what to *show*, never what is *allowed*: the API
//! enforces permissions on every route. A non-admin who bypassed these checks
//! would simply get 403 responses.

use serde::Serialize;

use crate::models::User;
use crate::query::TaskScope;

/// One entry of the main navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: &'static str,
    pub path: &'static str,
}

const NAVIGATION: &[NavItem] = &[
    NavItem {
        title: "Dashboard",
        path: "/dashboard",
    },
    NavItem {
        title: "Projects",
        path: "/projects",
    },
    NavItem {
        title: "Tasks",
        path: "/tasks",
    },
    NavItem {
        title: "Settings",
        path: "/settings",
    },
];

const ADMIN_NAVIGATION: &[NavItem] = &[NavItem {
    title: "Users",
    path: "/users",
}];

pub fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(User::is_admin)
}

/// Navigation for the signed-in user; admins also get the admin area.
pub fn navigation(user: Option<&User>) -> Vec<NavItem> {
    let mut items = NAVIGATION.to_vec();
    if is_admin(user) {
        items.extend_from_slice(ADMIN_NAVIGATION);
    }
    items
}

/// Which task-listing endpoint the task views use.
pub fn task_scope(user: Option<&User>) -> TaskScope {
    if is_admin(user) {
        TaskScope::AdminAll
    } else {
        TaskScope::Own
    }
}

/// Result of opening an admin-only view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate<T> {
    Granted(T),
    /// Rendered without contacting the API
    AccessDenied,
}

impl<T> Gate<T> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Gate::AccessDenied)
    }

    pub fn granted(self) -> Option<T> {
        match self {
            Gate::Granted(value) => Some(value),
            Gate::AccessDenied => None,
        }
    }
}
