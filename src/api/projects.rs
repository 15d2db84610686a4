//! Project endpoints.

use super::Api;
use crate::http::{ApiError, ApiRequest};
use crate::models::{ListParams, Page, Project, ProjectId, ProjectInput};

impl Api {
    /// `GET /projects?params`
    pub async fn projects(&self, params: &ListParams) -> Result<Page<Project>, ApiError> {
        self.fetch(ApiRequest::get("/projects").with_query(params.to_query()))
            .await
    }

    /// `GET /projects/:id`
    pub async fn project(&self, id: ProjectId) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::get(format!("/projects/{}", id))).await
    }

    /// `POST /projects`
    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::post("/projects").with_json(input)?)
            .await
    }

    /// `PATCH /projects/:id`
    pub async fn update_project(
        &self,
        id: ProjectId,
        input: &ProjectInput,
    ) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::patch(format!("/projects/{}", id)).with_json(input)?)
            .await
    }

    /// `DELETE /projects/:id`
    pub async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/projects/{}", id)))
            .await
    }
}
