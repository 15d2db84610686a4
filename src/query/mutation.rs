//! Writes and the cache keys each one invalidates.

use crate::api::Api;
use crate::http::ApiError;
use crate::models::{NewTask, Project, ProjectId, ProjectInput, Task, TaskId, TaskPatch, UserId};

use super::key::Invalidate;

/// A state-changing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateProject { name: String },
    UpdateProject { id: ProjectId, name: String },
    DeleteProject { id: ProjectId },
    CreateTask(NewTask),
    UpdateTask { id: TaskId, patch: TaskPatch },
    ToggleTask { id: TaskId },
    AssignTask { id: TaskId, assignee: UserId },
    UnassignTask { id: TaskId },
    DeleteTask { id: TaskId },
}

/// What a successful write returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Project(Project),
    Task(Task),
    Deleted,
}

impl MutationOutcome {
    pub fn project(&self) -> Option<&Project> {
        match self {
            MutationOutcome::Project(project) => Some(project),
            _ => None,
        }
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            MutationOutcome::Task(task) => Some(task),
            _ => None,
        }
    }
}

impl Mutation {
    pub(crate) async fn execute(&self, api: &Api) -> Result<MutationOutcome, ApiError> {
        Ok(match self {
            Mutation::CreateProject { name } => MutationOutcome::Project(
                api.create_project(&ProjectInput { name: name.clone() })
                    .await?,
            ),
            Mutation::UpdateProject { id, name } => MutationOutcome::Project(
                api.update_project(*id, &ProjectInput { name: name.clone() })
                    .await?,
            ),
            Mutation::DeleteProject { id } => {
                api.delete_project(*id).await?;
                MutationOutcome::Deleted
            }
            Mutation::CreateTask(task) => MutationOutcome::Task(api.create_task(task).await?),
            Mutation::UpdateTask { id, patch } => {
                MutationOutcome::Task(api.update_task(*id, patch).await?)
            }
            Mutation::ToggleTask { id } => MutationOutcome::Task(api.toggle_task(*id).await?),
            Mutation::AssignTask { id, assignee } => {
                MutationOutcome::Task(api.assign_task(*id, *assignee).await?)
            }
            Mutation::UnassignTask { id } => MutationOutcome::Task(api.unassign_task(*id).await?),
            Mutation::DeleteTask { id } => {
                api.delete_task(*id).await?;
                MutationOutcome::Deleted
            }
        })
    }

    /// Keys to mark stale once this write has succeeded.
    pub fn invalidations(&self, outcome: &MutationOutcome) -> Vec<Invalidate> {
        let owning_project = outcome.task().and_then(Task::owning_project);

        match self {
            Mutation::CreateProject { .. } => {
                let mut keys = vec![Invalidate::AllProjectLists];
                if let Some(project) = outcome.project() {
                    keys.push(Invalidate::ProjectDetail(project.id));
                }
                keys
            }
            Mutation::UpdateProject { id, .. } | Mutation::DeleteProject { id } => {
                vec![Invalidate::AllProjectLists, Invalidate::ProjectDetail(*id)]
            }
            Mutation::CreateTask(task) => vec![
                Invalidate::AllTaskLists,
                Invalidate::ProjectDetail(owning_project.unwrap_or(task.project_id)),
            ],
            Mutation::UpdateTask { id, .. }
            | Mutation::ToggleTask { id }
            | Mutation::AssignTask { id, .. }
            | Mutation::UnassignTask { id } => {
                let mut keys = vec![Invalidate::AllTaskLists, Invalidate::TaskDetail(*id)];
                if let Some(project) = owning_project {
                    keys.push(Invalidate::ProjectDetail(project));
                }
                keys
            }
            Mutation::DeleteTask { id } => vec![
                Invalidate::AllTaskLists,
                Invalidate::AllProjects,
                Invalidate::TaskDetail(*id),
            ],
        }
    }

    /// Success text shown after the write.
    pub fn success_message(&self, outcome: &MutationOutcome) -> &'static str {
        match self {
            Mutation::CreateProject { .. } => "Project created successfully",
            Mutation::UpdateProject { .. } => "Project updated successfully",
            Mutation::DeleteProject { .. } => "Project deleted successfully",
            Mutation::CreateTask(_) => "Task created successfully",
            Mutation::UpdateTask { .. } => "Task updated successfully",
            Mutation::ToggleTask { .. } => match outcome.task() {
                Some(task) if task.completed => "Task marked as completed",
                _ => "Task marked as active",
            },
            Mutation::AssignTask { .. } => "Task assigned successfully",
            Mutation::UnassignTask { .. } => "Task unassigned successfully",
            Mutation::DeleteTask { .. } => "Task deleted successfully",
        }
    }

    /// Prefix of the failure notice.
    pub fn failure_action(&self) -> &'static str {
        match self {
            Mutation::CreateProject { .. } => "Failed to create project",
            Mutation::UpdateProject { .. } => "Failed to update project",
            Mutation::DeleteProject { .. } => "Failed to delete project",
            Mutation::CreateTask(_) => "Failed to create task",
            Mutation::UpdateTask { .. } => "Failed to update task",
            Mutation::ToggleTask { .. } => "Failed to toggle task",
            Mutation::AssignTask { .. } => "Failed to assign task",
            Mutation::UnassignTask { .. } => "Failed to unassign task",
            Mutation::DeleteTask { .. } => "Failed to delete task",
        }
    }
}
