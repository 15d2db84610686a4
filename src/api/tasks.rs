//! Task endpoints.

use super::Api;
use crate::http::{ApiError, ApiRequest};
use crate::models::{ListParams, NewTask, Page, Task, TaskId, TaskPatch, UserId};

impl Api {
    /// `GET /tasks?params` - tasks visible to the current user
    pub async fn tasks(&self, params: &ListParams) -> Result<Page<Task>, ApiError> {
        self.fetch(ApiRequest::get("/tasks").with_query(params.to_query()))
            .await
    }

    /// `GET /tasks/admin/all?params` - every task (admin only; the server enforces it)
    pub async fn all_tasks(&self, params: &ListParams) -> Result<Page<Task>, ApiError> {
        self.fetch(ApiRequest::get("/tasks/admin/all").with_query(params.to_query()))
            .await
    }

    /// `GET /tasks/:id`
    pub async fn task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::get(format!("/tasks/{}", id))).await
    }

    /// `POST /tasks`
    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::post("/tasks").with_json(task)?).await
    }

    /// `PATCH /tasks/:id`
    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::patch(format!("/tasks/{}", id)).with_json(patch)?)
            .await
    }

    /// `DELETE /tasks/:id`
    pub async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/tasks/{}", id)))
            .await
    }

    /// `POST /tasks/:id/toggle-complete`
    pub async fn toggle_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::post(format!("/tasks/{}/toggle-complete", id)))
            .await
    }

    /// `POST /tasks/:id/assign/:assigneeId`
    pub async fn assign_task(&self, id: TaskId, assignee: UserId) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::post(format!("/tasks/{}/assign/{}", id, assignee)))
            .await
    }

    /// `POST /tasks/:id/unassign`
    pub async fn unassign_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::post(format!("/tasks/{}/unassign", id)))
            .await
    }
}
