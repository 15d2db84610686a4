//! Authenticated request layer.
//!
//! Every request is annotated with the current access token. A 401 triggers
//! one call to `/auth/refresh` (authenticated by the ambient cookie, never by
//! the expired token) and, if that succeeds, exactly one re-issue of the
//! original request. The retry budget is an explicit parameter, so a repeated
//! 401 can never loop.
//!
//! Refreshes are single-flight: concurrent 401s share one `/auth/refresh`
//! call, and a request whose token was already replaced just retries.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Session;
use crate::http::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::models::AuthTokens;

/// Path of the refresh endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

/// How many refresh-and-retry cycles a request may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRetry {
    /// Refresh and re-issue at most once (default for API calls)
    Once,
    /// Surface a 401 as-is (credential endpoints, and the re-issued request itself)
    Never,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<(), ApiError>>>;

/// The refresh currently running, if any.
#[derive(Default)]
struct RefreshSlot {
    next_id: u64,
    running: Option<(u64, SharedRefresh)>,
}

/// Sends requests on behalf of a `Session`.
#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    refresh: Arc<Mutex<RefreshSlot>>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self {
            transport,
            session,
            refresh: Arc::new(Mutex::new(RefreshSlot::default())),
        }
    }

    fn refresh_slot(&self) -> MutexGuard<'_, RefreshSlot> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Send with the default budget of one refresh-and-retry.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.send_with(request, AuthRetry::Once).await
    }

    /// Send with an explicit retry budget.
    ///
    /// Returns the 2xx response, or the error for any other status. Only a
    /// 401 is handled here; every other failure is returned untouched.
    pub async fn send_with(
        &self,
        request: &ApiRequest,
        retry: AuthRetry,
    ) -> Result<ApiResponse, ApiError> {
        let mut retry = retry;
        loop {
            let token = self.session.access_token();
            tracing::debug!(
                request = %request.describe(),
                authenticated = token.is_some(),
                "Sending request"
            );
            let response = self.transport.execute(request, token.as_deref()).await?;

            if !response.is_unauthorized() {
                return response.into_result();
            }

            match retry {
                AuthRetry::Never => return Err(ApiError::from_response(&response)),
                AuthRetry::Once => {
                    let current = self.session.access_token();
                    if current.is_some() && current != token {
                        tracing::debug!(
                            request = %request.describe(),
                            "Token replaced while in flight, retrying"
                        );
                    } else {
                        tracing::info!(
                            request = %request.describe(),
                            "Access token rejected, attempting refresh"
                        );
                        self.refresh().await?;
                    }
                    retry = AuthRetry::Never;
                }
            }
        }
    }

    /// Exchange the ambient credential for a new access token.
    ///
    /// Joins the refresh already running, if any. On any failure the session
    /// is expired (token cleared, `LoginRequired` emitted) and
    /// `AuthenticationFailed` is returned.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let (id, refresh) = {
            let mut slot = self.refresh_slot();
            match slot.running {
                Some((id, ref refresh)) => {
                    tracing::debug!("Joining running token refresh");
                    (id, refresh.clone())
                }
                None => {
                    slot.next_id += 1;
                    let id = slot.next_id;
                    let refresh = Self::exchange(self.transport.clone(), self.session.clone())
                        .boxed()
                        .shared();
                    slot.running = Some((id, refresh.clone()));
                    (id, refresh)
                }
            }
        };

        let result = refresh.await;

        let mut slot = self.refresh_slot();
        if slot.running.as_ref().is_some_and(|(running, _)| *running == id) {
            slot.running = None;
        }
        result
    }

    async fn exchange(
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).with_json(&serde_json::json!({}))?;

        let outcome = match transport.execute(&request, None).await {
            Ok(response) if response.is_success() => response.json::<AuthTokens>(),
            Ok(response) => Err(ApiError::from_response(&response)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(tokens) => {
                tracing::info!("Access token refreshed");
                session.refresh_token(tokens.access_token);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                session.expire();
                Err(ApiError::AuthenticationFailed(e.message().to_string()))
            }
        }
    }
}
