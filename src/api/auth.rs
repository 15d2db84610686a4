//! Credential endpoints.

use super::Api;
use crate::http::{ApiError, ApiRequest};
use crate::models::{AuthTokens, Credentials};
use crate::session::AuthRetry;

impl Api {
    /// `POST /auth/register`
    ///
    /// Sent without a refresh budget: a 401 here is a rejected credential,
    /// not an expired session.
    pub async fn register(&self, credentials: &Credentials) -> Result<AuthTokens, ApiError> {
        let request = ApiRequest::post("/auth/register").with_json(credentials)?;
        self.fetch_with(request, AuthRetry::Never).await
    }

    /// `POST /auth/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, ApiError> {
        let request = ApiRequest::post("/auth/login").with_json(credentials)?;
        self.fetch_with(request, AuthRetry::Never).await
    }

    /// `POST /auth/logout`, clearing the server-side refresh credential.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = ApiRequest::post("/auth/logout");
        self.client
            .send_with(&request, AuthRetry::Never)
            .await
            .map(|_| ())
    }
}
