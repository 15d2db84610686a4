//! Project commands.

use serde::Serialize;
use std::sync::Arc;

use super::{Output, json, mutate, require_user};
use crate::models::{ListParams, Page, Project, ProjectId};
use crate::notify::Notice;
use crate::query::{Mutation, MutationOutcome};
use crate::{Result, Taskflow};

/// Result of `tf project list`.
#[derive(Debug, Serialize)]
pub struct ProjectList {
    #[serde(flatten)]
    pub page: Arc<Page<Project>>,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.page.data.is_empty() {
            return "No projects found".to_string();
        }
        let mut lines = vec![format!(
            "{} project(s), showing {}:",
            self.page.meta.total,
            self.page.data.len()
        )];
        for project in &self.page.data {
            lines.push(format!(
                "  #{} {} (created {})",
                project.id,
                project.name,
                project.created_at.format("%Y-%m-%d")
            ));
        }
        lines.join("\n")
    }
}

pub async fn list(app: &Taskflow, params: ListParams) -> Result<ProjectList> {
    require_user(app).await?;
    Ok(ProjectList {
        page: app.query().projects(params).await?,
    })
}

/// Result of `tf project show`.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub project: Arc<Project>,
}

impl Output for ProjectDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let project = &self.project;
        let mut lines = vec![
            format!("#{} {}", project.id, project.name),
            format!("  Created: {}", project.created_at.format("%Y-%m-%d %H:%M")),
        ];
        if project.tasks.is_empty() {
            lines.push("  No tasks".to_string());
        } else {
            let done = project.tasks.iter().filter(|t| t.completed).count();
            lines.push(format!("  Tasks ({}/{} done):", done, project.tasks.len()));
            for task in &project.tasks {
                let mark = if task.completed { "x" } else { " " };
                lines.push(format!("    [{}] #{} {}", mark, task.id, task.title));
            }
        }
        lines.join("\n")
    }
}

pub async fn show(app: &Taskflow, id: ProjectId) -> Result<ProjectDetail> {
    require_user(app).await?;
    Ok(ProjectDetail {
        project: app.query().project(id).await?,
    })
}

/// Result of a project mutation.
#[derive(Debug, Serialize)]
pub struct ProjectChanged {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

impl Output for ProjectChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.project {
            Some(ref project) => format!("{}\n  #{} {}", self.notice, project.id, project.name),
            None => self.notice.to_string(),
        }
    }
}

async fn change(app: &Taskflow, mutation: Mutation) -> Result<ProjectChanged> {
    require_user(app).await?;
    let (outcome, notice) = mutate(app, mutation).await?;
    let project = match outcome {
        MutationOutcome::Project(project) => Some(project),
        _ => None,
    };
    Ok(ProjectChanged { notice, project })
}

pub async fn create(app: &Taskflow, name: String) -> Result<ProjectChanged> {
    change(app, Mutation::CreateProject { name }).await
}

pub async fn rename(app: &Taskflow, id: ProjectId, name: String) -> Result<ProjectChanged> {
    change(app, Mutation::UpdateProject { id, name }).await
}

pub async fn delete(app: &Taskflow, id: ProjectId) -> Result<ProjectChanged> {
    change(app, Mutation::DeleteProject { id }).await
}
