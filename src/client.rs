//! Application root.
//!
//! `Taskflow` owns the session, the API client and the query cache, and wires
//! them together. Front ends hold one `Taskflow` per signed-in device.

use serde::Serialize;
use std::sync::Arc;

use crate::access::{self, Gate, NavItem};
use crate::api::Api;
use crate::http::{ApiError, Transport};
use crate::models::{AuthTokens, Credentials, ListParams, Project, Task, User};
use crate::query::{QueryClient, QueryOptions, TaskScope};
use crate::session::{Session, SessionClient, TokenStore};

/// Number of projects shown on the dashboard
pub const DASHBOARD_PROJECT_LIMIT: u32 = 5;

pub struct Taskflow {
    session: Arc<Session>,
    query: QueryClient,
}

impl Taskflow {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        Self::with_options(transport, store, QueryOptions::default())
    }

    pub fn with_options(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        options: QueryOptions,
    ) -> Self {
        let session = Arc::new(Session::new(store));
        let api = Api::new(SessionClient::new(transport, session.clone()));
        Self {
            session,
            query: QueryClient::with_options(api, options),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &Api {
        self.query.api()
    }

    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Re-establish the session from a persisted token.
    ///
    /// Any failure (expired token with no usable refresh, network error)
    /// silently discards the token: the user is just signed out.
    pub async fn restore(&self) -> Option<User> {
        if !self.session.has_token() {
            return None;
        }
        match self.api().profile().await {
            Ok(user) => {
                tracing::debug!(user = %user.email, "Session restored");
                self.session.set_user(user.clone());
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Could not restore session");
                self.session.discard();
                None
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.api().login(&Credentials::new(email, password)).await?;
        self.sign_in(tokens).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self
            .api()
            .register(&Credentials::new(email, password))
            .await?;
        self.sign_in(tokens).await
    }

    async fn sign_in(&self, tokens: AuthTokens) -> Result<User, ApiError> {
        // Nothing cached for a previous user may leak into this session.
        self.query.reset();
        self.session.set_token(tokens.access_token);
        match self.api().profile().await {
            Ok(user) => {
                tracing::info!(user = %user.email, role = %user.role, "Signed in");
                self.session.set_user(user.clone());
                Ok(user)
            }
            Err(e) => {
                self.session.discard();
                Err(e)
            }
        }
    }

    /// Best-effort server logout; the local session is always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.api().logout().await {
            tracing::warn!(error = %e, "Server logout failed; clearing local session anyway");
        }
        self.session.sign_out();
        self.query.reset();
    }

    pub fn navigation(&self) -> Vec<NavItem> {
        access::navigation(self.current_user().as_ref())
    }

    pub fn task_scope(&self) -> TaskScope {
        access::task_scope(self.current_user().as_ref())
    }

    /// Recent projects and task statistics.
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        let (projects, tasks) = tokio::join!(
            self.query
                .projects(ListParams::recent(DASHBOARD_PROJECT_LIMIT)),
            self.query.tasks(TaskScope::Own, ListParams::new()),
        );
        let (projects, tasks) = (projects?, tasks?);

        let completed = tasks.data.iter().filter(|t| t.completed).count() as u64;
        Ok(Dashboard {
            stats: DashboardStats::new(projects.meta.total, tasks.meta.total, completed),
            recent_projects: projects.data.clone(),
        })
    }

    /// Tasks in the current user's scope, split by completion.
    pub async fn task_board(&self, params: ListParams) -> Result<TaskBoard, ApiError> {
        let scope = self.task_scope();
        let page = self.query.tasks(scope, params).await?;
        let (completed, active): (Vec<Task>, Vec<Task>) =
            page.data.iter().cloned().partition(|t| t.completed);
        Ok(TaskBoard {
            scope,
            total: page.meta.total,
            active,
            completed,
        })
    }

    /// The admin user listing. Non-admins are denied before any request.
    pub async fn users_view(&self) -> Result<Gate<Arc<Vec<User>>>, ApiError> {
        if !access::is_admin(self.current_user().as_ref()) {
            return Ok(Gate::AccessDenied);
        }
        Ok(Gate::Granted(self.query.users().await?))
    }

    pub fn account(&self) -> Option<AccountSummary> {
        self.current_user().map(|user| AccountSummary::from(&user))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_projects: u64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    /// Rounded percentage; absent when there are no tasks
    pub completion_rate: Option<u64>,
}

impl DashboardStats {
    pub fn new(total_projects: u64, total_tasks: u64, completed_tasks: u64) -> Self {
        let completion_rate = (total_tasks > 0)
            .then(|| (completed_tasks as f64 / total_tasks as f64 * 100.0).round() as u64);
        Self {
            total_projects,
            total_tasks,
            completed_tasks,
            completion_rate,
        }
    }

    pub fn completion_label(&self) -> String {
        match self.completion_rate {
            Some(rate) => format!("{}% completion rate", rate),
            None => "No tasks yet".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskBoard {
    #[serde(serialize_with = "serialize_scope")]
    pub scope: TaskScope,
    pub total: u64,
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
}

fn serialize_scope<S: serde::Serializer>(scope: &TaskScope, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(match scope {
        TaskScope::Own => "own",
        TaskScope::AdminAll => "all",
    })
}

/// Settings-page view of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: u64,
    pub email: String,
    /// Lower-cased role name
    pub role: String,
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            email: user.email.clone(),
            role: user.role.as_str().to_lowercase(),
        }
    }
}
