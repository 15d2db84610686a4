//! Typed cache keys and invalidation patterns.

use std::fmt;

use crate::models::{ListParams, ProjectId, TaskId};

/// Which task-listing endpoint a list was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskScope {
    /// `/tasks`: tasks visible to the current user
    Own,
    /// `/tasks/admin/all`
    AdminAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskListFilter {
    pub scope: TaskScope,
    pub params: ListParams,
}

/// Identity of one cached query, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    ProjectList(ListParams),
    ProjectDetail(ProjectId),
    TaskList(TaskListFilter),
    TaskDetail(TaskId),
    UserList,
    Profile,
}

impl QueryKey {
    pub fn task_list(scope: TaskScope, params: ListParams) -> Self {
        QueryKey::TaskList(TaskListFilter { scope, params })
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::ProjectList(params) => write_list(f, "projects", params),
            QueryKey::ProjectDetail(id) => write!(f, "projects/{}", id),
            QueryKey::TaskList(filter) => {
                let base = match filter.scope {
                    TaskScope::Own => "tasks",
                    TaskScope::AdminAll => "tasks/admin/all",
                };
                write_list(f, base, &filter.params)
            }
            QueryKey::TaskDetail(id) => write!(f, "tasks/{}", id),
            QueryKey::UserList => write!(f, "users"),
            QueryKey::Profile => write!(f, "users/profile"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, base: &str, params: &ListParams) -> fmt::Result {
    let query: Vec<String> = params
        .to_query()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    if query.is_empty() {
        write!(f, "{}", base)
    } else {
        write!(f, "{}?{}", base, query.join("&"))
    }
}

/// A set of keys to mark stale after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidate {
    /// Every project list, whatever its parameters
    AllProjectLists,
    /// Every project list and every project detail
    AllProjects,
    ProjectDetail(ProjectId),
    /// Every task list, in both scopes
    AllTaskLists,
    TaskDetail(TaskId),
}

impl Invalidate {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::ProjectList(_) => {
                matches!(self, Invalidate::AllProjectLists | Invalidate::AllProjects)
            }
            QueryKey::ProjectDetail(id) => match self {
                Invalidate::AllProjects => true,
                Invalidate::ProjectDetail(target) => target == id,
                Invalidate::AllProjectLists
                | Invalidate::AllTaskLists
                | Invalidate::TaskDetail(_) => false,
            },
            QueryKey::TaskList(_) => matches!(self, Invalidate::AllTaskLists),
            QueryKey::TaskDetail(id) => match self {
                Invalidate::TaskDetail(target) => target == id,
                Invalidate::AllProjectLists
                | Invalidate::AllProjects
                | Invalidate::ProjectDetail(_)
                | Invalidate::AllTaskLists => false,
            },
            // Never touched by a mutation; only `reset` drops these.
            QueryKey::UserList | QueryKey::Profile => false,
        }
    }
}
