//! `tf dashboard`.

use super::{Output, json, require_user};
use crate::client::Dashboard;
use crate::{Result, Taskflow};

impl Output for Dashboard {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Projects:        {}", self.stats.total_projects),
            format!("Tasks:           {}", self.stats.total_tasks),
            format!("Completed tasks: {}", self.stats.completed_tasks),
            format!("  {}", self.stats.completion_label()),
            String::new(),
        ];
        if self.recent_projects.is_empty() {
            lines.push("No projects yet".to_string());
        } else {
            lines.push("Recent projects:".to_string());
            for project in &self.recent_projects {
                lines.push(format!(
                    "  #{} {} (created {})",
                    project.id,
                    project.name,
                    project.created_at.format("%Y-%m-%d")
                ));
            }
        }
        lines.join("\n")
    }
}

pub async fn show(app: &Taskflow) -> Result<Dashboard> {
    require_user(app).await?;
    Ok(app.dashboard().await?)
}
