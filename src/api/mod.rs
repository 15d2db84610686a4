//! Typed wrappers for every route of the remote API.
//!
//! Endpoints are grouped by resource:
//! - `auth` - register, login, logout
//! - `projects` - project CRUD
//! - `tasks` - task CRUD, completion toggle, assignment
//! - `users` - profile and the admin user listing
//!
//! All calls go through `SessionClient`, so they share the token slot and the
//! refresh-on-401 behaviour.

mod auth;
mod projects;
mod tasks;
mod users;

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::http::{ApiError, ApiRequest};
use crate::session::{AuthRetry, Session, SessionClient};

/// Client for the remote REST API.
#[derive(Clone)]
pub struct Api {
    client: SessionClient,
}

impl Api {
    pub fn new(client: SessionClient) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn session_client(&self) -> &SessionClient {
        &self.client
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.client.send(&request).await?.json()
    }

    async fn fetch_with<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        retry: AuthRetry,
    ) -> Result<T, ApiError> {
        self.client.send_with(&request, retry).await?.json()
    }

    /// Send a request whose response body is ignored.
    async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.client.send(&request).await.map(|_| ())
    }
}
