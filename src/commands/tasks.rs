//! Task commands.

use serde::Serialize;
use std::sync::Arc;

use super::{Output, json, mutate, or_dash, require_user};
use crate::client::TaskBoard;
use crate::models::{ListParams, NewTask, ProjectId, Task, TaskId, TaskPatch, UserId};
use crate::notify::Notice;
use crate::query::{Mutation, MutationOutcome, TaskScope};
use crate::{Error, Result, Taskflow};

fn task_line(task: &Task) -> String {
    let project = task
        .project
        .as_ref()
        .map(|p| format!(" [{}]", p.name))
        .unwrap_or_default();
    let assignee = task
        .assignee
        .as_ref()
        .map(|a| format!(" @{}", or_dash(a.email.as_deref())))
        .unwrap_or_default();
    format!("#{} {}{}{}", task.id, task.title, project, assignee)
}

impl Output for TaskBoard {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let heading = match self.scope {
            TaskScope::Own => "Your tasks",
            TaskScope::AdminAll => "All tasks",
        };
        let mut lines = vec![format!("{} ({} total)", heading, self.total)];
        lines.push(format!("Active ({}):", self.active.len()));
        lines.extend(self.active.iter().map(|t| format!("  [ ] {}", task_line(t))));
        lines.push(format!("Completed ({}):", self.completed.len()));
        lines.extend(self.completed.iter().map(|t| format!("  [x] {}", task_line(t))));
        lines.join("\n")
    }
}

/// Task listing in the caller's scope (admins see every task).
pub async fn list(app: &Taskflow, params: ListParams) -> Result<TaskBoard> {
    require_user(app).await?;
    Ok(app.task_board(params).await?)
}

/// Result of `tf task show`.
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub task: Arc<Task>,
}

impl Output for TaskDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let task = &self.task;
        let status = match task.completed_at {
            Some(at) => format!("completed {}", at.format("%Y-%m-%d %H:%M")),
            None if task.completed => "completed".to_string(),
            None => "active".to_string(),
        };
        let project = match (&task.project, task.owning_project()) {
            (Some(p), _) => format!("#{} {}", p.id, p.name),
            (None, Some(id)) => format!("#{}", id),
            (None, None) => "-".to_string(),
        };
        let mut lines = vec![
            format!("#{} {}", task.id, task.title),
            format!("  Status:   {}", status),
            format!("  Project:  {}", project),
            format!(
                "  Assignee: {}",
                or_dash(task.assignee.as_ref().and_then(|a| a.email.as_deref()))
            ),
            format!("  Created:  {}", task.created_at.format("%Y-%m-%d %H:%M")),
        ];
        if let Some(ref description) = task.description {
            lines.push(String::new());
            lines.push(description.clone());
        }
        lines.join("\n")
    }
}

pub async fn show(app: &Taskflow, id: TaskId) -> Result<TaskDetail> {
    require_user(app).await?;
    Ok(TaskDetail {
        task: app.query().task(id).await?,
    })
}

/// Result of a task mutation.
#[derive(Debug, Serialize)]
pub struct TaskChanged {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

impl Output for TaskChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.task {
            Some(ref task) => format!("{}\n  {}", self.notice, task_line(task)),
            None => self.notice.to_string(),
        }
    }
}

async fn change(app: &Taskflow, mutation: Mutation) -> Result<TaskChanged> {
    require_user(app).await?;
    let (outcome, notice) = mutate(app, mutation).await?;
    let task = match outcome {
        MutationOutcome::Task(task) => Some(task),
        _ => None,
    };
    Ok(TaskChanged { notice, task })
}

pub async fn create(
    app: &Taskflow,
    project_id: ProjectId,
    title: String,
    description: Option<String>,
) -> Result<TaskChanged> {
    let task = NewTask {
        title,
        description,
        project_id,
    };
    change(app, Mutation::CreateTask(task)).await
}

pub async fn update(app: &Taskflow, id: TaskId, patch: TaskPatch) -> Result<TaskChanged> {
    if patch.is_empty() {
        return Err(Error::InvalidInput(
            "nothing to update: pass --title, --description or --completed".to_string(),
        ));
    }
    change(app, Mutation::UpdateTask { id, patch }).await
}

pub async fn toggle(app: &Taskflow, id: TaskId) -> Result<TaskChanged> {
    change(app, Mutation::ToggleTask { id }).await
}

pub async fn assign(app: &Taskflow, id: TaskId, assignee: UserId) -> Result<TaskChanged> {
    change(app, Mutation::AssignTask { id, assignee }).await
}

pub async fn unassign(app: &Taskflow, id: TaskId) -> Result<TaskChanged> {
    change(app, Mutation::UnassignTask { id }).await
}

pub async fn delete(app: &Taskflow, id: TaskId) -> Result<TaskChanged> {
    change(app, Mutation::DeleteTask { id }).await
}
