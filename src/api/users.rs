use super::Api;
use crate::http::{ApiError, ApiRequest};
use crate::models::User;

impl Api {
    /// `GET /users/profile`
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.fetch(ApiRequest::get("/users/profile")).await
    }

    /// `GET /users` (admin only; the server enforces it)
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(ApiRequest::get("/users")).await
    }
}
