//! In-process stand-in for the remote API.
//!
//! `FakeServer` implements `Transport` directly, so library tests exercise the
//! real session, query and view layers without a socket. It keeps its own
//! users, projects and tasks, issues opaque access tokens, and models the
//! refresh cookie as a single "who is signed in on this device" slot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::api::Api;
use crate::http::{ApiError, ApiRequest, ApiResponse, Method, Transport};
use crate::models::{
    Assignee, Credentials, NewTask, Page, PageMeta, Project, ProjectId, ProjectInput, ProjectRef,
    Role, Task, TaskId, TaskPatch, User, UserId,
};
use crate::session::{Session, SessionClient};

pub const ADMIN_ID: UserId = UserId(1);
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub const USER_ID: UserId = UserId(2);
pub const USER_EMAIL: &str = "user@example.com";
pub const USER_PASSWORD: &str = "user-pass";

struct Account {
    user: User,
    password: String,
}

struct StoredProject {
    id: ProjectId,
    name: String,
    owner: UserId,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    projects: BTreeMap<ProjectId, StoredProject>,
    tasks: BTreeMap<TaskId, Task>,
    tokens: HashMap<String, UserId>,
    refresh_user: Option<UserId>,
    next_id: u64,
    next_token: u64,
    reject_all: bool,
    failures: HashMap<String, u16>,
    calls: Vec<String>,
    bearers: Vec<Option<String>>,
}

fn timestamp(id: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + id as i64 * 60, 0).unwrap()
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user: UserId) -> String {
        self.next_token += 1;
        let token = format!("access-{}-{}", user, self.next_token);
        self.tokens.insert(token.clone(), user);
        token
    }

    fn account(&self, id: UserId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user.id == id)
    }

    fn caller(&self, bearer: Option<&str>) -> Result<User, ApiResponse> {
        if self.reject_all {
            return Err(error(401, "Unauthorized"));
        }
        bearer
            .and_then(|token| self.tokens.get(token))
            .and_then(|id| self.account(*id))
            .map(|a| a.user.clone())
            .ok_or_else(|| error(401, "Unauthorized"))
    }

    fn render_task(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.project = task.project_id.and_then(|id| {
            self.projects.get(&id).map(|p| ProjectRef {
                id: p.id,
                name: p.name.clone(),
            })
        });
        task
    }

    fn render_project(&self, project: &StoredProject, with_tasks: bool) -> Project {
        let tasks = if with_tasks {
            self.tasks
                .values()
                .filter(|t| t.project_id == Some(project.id))
                .map(|t| self.render_task(t))
                .collect()
        } else {
            Vec::new()
        };
        Project {
            id: project.id,
            name: project.name.clone(),
            created_at: project.created_at,
            tasks,
        }
    }

    fn task_visible_to(&self, task: &Task, user: &User) -> bool {
        let owns_project = task
            .project_id
            .and_then(|id| self.projects.get(&id))
            .is_some_and(|p| p.owner == user.id);
        let assigned = task.assignee.as_ref().is_some_and(|a| a.id == user.id);
        owns_project || assigned
    }
}

/// Scripted API server backing library tests.
pub struct FakeServer {
    state: Mutex<State>,
    paused: watch::Sender<bool>,
}

impl FakeServer {
    pub fn new() -> Self {
        let state = State {
            accounts: vec![
                Account {
                    user: User {
                        id: ADMIN_ID,
                        email: ADMIN_EMAIL.to_string(),
                        role: Role::Admin,
                        created_at: Some(timestamp(1)),
                    },
                    password: ADMIN_PASSWORD.to_string(),
                },
                Account {
                    user: User {
                        id: USER_ID,
                        email: USER_EMAIL.to_string(),
                        role: Role::User,
                        created_at: Some(timestamp(2)),
                    },
                    password: USER_PASSWORD.to_string(),
                },
            ],
            next_id: 100,
            ..State::default()
        };
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(state),
            paused,
        }
    }

    /// A server plus an `Api` already holding a valid token for `user`.
    pub fn signed_in_api(user: UserId) -> (Arc<FakeServer>, Api) {
        let server = Arc::new(FakeServer::new());
        let api = server.api();
        api.session().set_token(server.sign_in(user));
        (server, api)
    }

    /// An `Api` with an empty in-memory session.
    pub fn api(self: &Arc<Self>) -> Api {
        Api::new(SessionClient::new(
            self.clone(),
            Arc::new(Session::in_memory()),
        ))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue an access token and set the refresh cookie for `user`.
    pub fn sign_in(&self, user: UserId) -> String {
        let mut state = self.state();
        state.refresh_user = Some(user);
        state.issue_token(user)
    }

    /// Invalidate every access token issued so far; the refresh cookie survives.
    pub fn expire_access_tokens(&self) {
        self.state().tokens.clear();
    }

    /// Invalidate the refresh cookie.
    pub fn revoke_refresh(&self) {
        self.state().refresh_user = None;
    }

    /// Answer 401 on every protected route, even for freshly refreshed tokens.
    pub fn reject_all_tokens(&self) {
        self.state().reject_all = true;
    }

    /// Make the next call to `route` (e.g. `"GET /projects"`) fail with `status`.
    pub fn fail_next(&self, route: &str, status: u16) {
        self.state().failures.insert(route.to_string(), status);
    }

    /// Hold every request after it has been recorded, until `resume`.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Every request received, as `METHOD /path`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, route: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == route).count()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.bearers.clear();
    }

    /// Bearer token of every request received, in order.
    pub fn bearers(&self) -> Vec<Option<String>> {
        self.state().bearers.clone()
    }

    /// Create a project owned by the admin account.
    pub fn seed_project(&self, name: &str) -> Project {
        self.seed_project_for(ADMIN_ID, name)
    }

    pub fn seed_project_for(&self, owner: UserId, name: &str) -> Project {
        let mut state = self.state();
        let id = ProjectId(state.next_id());
        let project = StoredProject {
            id,
            name: name.to_string(),
            owner,
            created_at: timestamp(id.0),
        };
        let rendered = state.render_project(&project, false);
        state.projects.insert(id, project);
        rendered
    }

    pub fn seed_task(&self, project: ProjectId, title: &str) -> Task {
        let mut state = self.state();
        let id = TaskId(state.next_id());
        let task = Task {
            id,
            title: title.to_string(),
            description: None,
            completed: false,
            completed_at: None,
            project_id: Some(project),
            project: None,
            assignee: None,
            created_at: timestamp(id.0),
        };
        state.tasks.insert(id, task.clone());
        state.render_task(&task)
    }

    /// Current server-side name of a project.
    pub fn project_name(&self, id: ProjectId) -> Option<String> {
        self.state().projects.get(&id).map(|p| p.name.clone())
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        {
            let mut state = self.state();
            state.calls.push(request.describe());
            state.bearers.push(bearer.map(str::to_string));
        }

        // Give concurrent callers a chance to observe the request as in flight.
        tokio::task::yield_now().await;
        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|p| !*p).await;

        let mut state = self.state();
        if let Some(status) = state.failures.remove(&request.describe()) {
            return Ok(error(status, "Injected failure"));
        }
        Ok(route(&mut state, request, bearer))
    }
}

fn respond(status: u16, body: impl Serialize) -> ApiResponse {
    ApiResponse::new(status, serde_json::to_vec(&body).unwrap())
}

fn error(status: u16, message: &str) -> ApiResponse {
    respond(status, json!({ "statusCode": status, "message": message }))
}

fn validation(messages: &[&str]) -> ApiResponse {
    respond(400, json!({ "statusCode": 400, "message": messages }))
}

fn body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Option<T> {
    request
        .body
        .clone()
        .and_then(|b| serde_json::from_value(b).ok())
}

fn query<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Apply search, sort and pagination the way the API does.
fn paginate<T: Clone>(
    request: &ApiRequest,
    mut items: Vec<T>,
    text: impl Fn(&T) -> String,
    created: impl Fn(&T) -> DateTime<Utc>,
) -> Page<T> {
    if let Some(search) = query(request, "search") {
        let needle = search.to_lowercase();
        items.retain(|item| text(item).to_lowercase().contains(&needle));
    }
    items.sort_by_key(|item| created(item));
    if query(request, "sortOrder") == Some("desc") {
        items.reverse();
    }
    let total = items.len() as u64;
    let limit: usize = query(request, "limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(10);
    let page: usize = query(request, "page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let data = items
        .into_iter()
        .skip(page.saturating_sub(1) * limit)
        .take(limit)
        .collect();
    Page {
        data,
        meta: PageMeta { total },
    }
}

fn route(state: &mut State, request: &ApiRequest, bearer: Option<&str>) -> ApiResponse {
    let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

    match (request.method, segments.as_slice()) {
        (Method::Post, ["auth", "login"]) => login(state, request),
        (Method::Post, ["auth", "register"]) => register(state, request),
        (Method::Post, ["auth", "refresh"]) => match state.refresh_user {
            Some(user) => respond(200, json!({ "access_token": state.issue_token(user) })),
            None => error(401, "Invalid refresh token"),
        },
        _ => {
            let user = match state.caller(bearer) {
                Ok(user) => user,
                Err(response) => return response,
            };
            protected(state, request, &segments, &user)
        }
    }
}

fn login(state: &mut State, request: &ApiRequest) -> ApiResponse {
    let Some(credentials) = body::<Credentials>(request) else {
        return validation(&["email must be an email"]);
    };
    let found = state
        .accounts
        .iter()
        .find(|a| a.user.email == credentials.email && a.password == credentials.password)
        .map(|a| a.user.id);
    match found {
        Some(id) => {
            state.refresh_user = Some(id);
            respond(200, json!({ "access_token": state.issue_token(id) }))
        }
        None => error(401, "Invalid credentials"),
    }
}

fn register(state: &mut State, request: &ApiRequest) -> ApiResponse {
    let Some(credentials) = body::<Credentials>(request) else {
        return validation(&["email must be an email"]);
    };
    let mut problems = Vec::new();
    if !credentials.email.contains('@') {
        problems.push("email must be an email");
    }
    if credentials.password.len() < 6 {
        problems.push("password must be longer than or equal to 6 characters");
    }
    if !problems.is_empty() {
        return validation(&problems);
    }
    if state.accounts.iter().any(|a| a.user.email == credentials.email) {
        return error(409, "User with this email already exists");
    }
    let id = UserId(state.next_id());
    state.accounts.push(Account {
        user: User {
            id,
            email: credentials.email,
            role: Role::User,
            created_at: Some(timestamp(id.0)),
        },
        password: credentials.password,
    });
    state.refresh_user = Some(id);
    respond(201, json!({ "access_token": state.issue_token(id) }))
}

fn protected(
    state: &mut State,
    request: &ApiRequest,
    segments: &[&str],
    user: &User,
) -> ApiResponse {
    let id = |i: usize| segments.get(i).and_then(|s| s.parse::<u64>().ok());

    match (request.method, segments) {
        (Method::Post, ["auth", "logout"]) => {
            state.refresh_user = None;
            respond(200, json!({ "message": "Logged out" }))
        }
        (Method::Get, ["users", "profile"]) => {
            let mut profile = user.clone();
            profile.created_at = None;
            respond(200, profile)
        }
        (Method::Get, ["users"]) => {
            if !user.is_admin() {
                return error(403, "Forbidden resource");
            }
            let users: Vec<User> = state.accounts.iter().map(|a| a.user.clone()).collect();
            respond(200, users)
        }

        (Method::Get, ["projects"]) => {
            let projects: Vec<Project> = state
                .projects
                .values()
                .filter(|p| p.owner == user.id)
                .map(|p| state.render_project(p, false))
                .collect();
            respond(
                200,
                paginate(request, projects, |p| p.name.clone(), |p| p.created_at),
            )
        }
        (Method::Post, ["projects"]) => {
            let name = body::<ProjectInput>(request)
                .map(|input| input.name)
                .unwrap_or_default();
            if name.trim().is_empty() {
                return validation(&["name should not be empty"]);
            }
            let id = ProjectId(state.next_id());
            let project = StoredProject {
                id,
                name,
                owner: user.id,
                created_at: timestamp(id.0),
            };
            let rendered = state.render_project(&project, false);
            state.projects.insert(id, project);
            respond(201, rendered)
        }
        (Method::Get, ["projects", _]) => match id(1).and_then(|i| state.projects.get(&ProjectId(i))) {
            Some(project) => respond(200, state.render_project(project, true)),
            None => error(404, "Project not found"),
        },
        (Method::Patch, ["projects", _]) => {
            let Some(key) = id(1).map(ProjectId).filter(|k| state.projects.contains_key(k))
            else {
                return error(404, "Project not found");
            };
            match body::<ProjectInput>(request).map(|input| input.name) {
                Some(name) if !name.trim().is_empty() => {
                    if let Some(project) = state.projects.get_mut(&key) {
                        project.name = name;
                    }
                }
                _ => return validation(&["name should not be empty"]),
            }
            respond(200, state.render_project(&state.projects[&key], false))
        }
        (Method::Delete, ["projects", _]) => {
            let Some(removed) = id(1).and_then(|i| state.projects.remove(&ProjectId(i))) else {
                return error(404, "Project not found");
            };
            state.tasks.retain(|_, t| t.project_id != Some(removed.id));
            respond(200, json!({}))
        }

        (Method::Get, ["tasks"]) => {
            let tasks: Vec<Task> = state
                .tasks
                .values()
                .filter(|t| state.task_visible_to(t, user))
                .map(|t| state.render_task(t))
                .collect();
            respond(
                200,
                paginate(request, tasks, |t| t.title.clone(), |t| t.created_at),
            )
        }
        (Method::Get, ["tasks", "admin", "all"]) => {
            if !user.is_admin() {
                return error(403, "Forbidden resource");
            }
            let tasks: Vec<Task> = state.tasks.values().map(|t| state.render_task(t)).collect();
            respond(
                200,
                paginate(request, tasks, |t| t.title.clone(), |t| t.created_at),
            )
        }
        (Method::Post, ["tasks"]) => {
            let Some(new) = body::<NewTask>(request) else {
                return validation(&["title should not be empty"]);
            };
            if new.title.trim().is_empty() {
                return validation(&["title should not be empty"]);
            }
            if !state.projects.contains_key(&new.project_id) {
                return error(404, "Project not found");
            }
            let id = TaskId(state.next_id());
            let task = Task {
                id,
                title: new.title,
                description: new.description,
                completed: false,
                completed_at: None,
                project_id: Some(new.project_id),
                project: None,
                assignee: None,
                created_at: timestamp(id.0),
            };
            state.tasks.insert(id, task.clone());
            respond(201, state.render_task(&task))
        }
        (Method::Get, ["tasks", _]) => with_task(state, id(1), |_, _| Ok(())),
        (Method::Patch, ["tasks", _]) => {
            let patch = body::<TaskPatch>(request).unwrap_or_default();
            with_task(state, id(1), |_, task| {
                if let Some(title) = patch.title {
                    task.title = title;
                }
                if let Some(description) = patch.description {
                    task.description = Some(description);
                }
                if let Some(completed) = patch.completed {
                    set_completed(task, completed);
                }
                Ok(())
            })
        }
        (Method::Delete, ["tasks", _]) => {
            match id(1).and_then(|i| state.tasks.remove(&TaskId(i))) {
                Some(_) => respond(200, json!({})),
                None => error(404, "Task not found"),
            }
        }
        (Method::Post, ["tasks", _, "toggle-complete"]) => with_task(state, id(1), |_, task| {
            let completed = !task.completed;
            set_completed(task, completed);
            Ok(())
        }),
        (Method::Post, ["tasks", _, "assign", _]) => {
            let assignee = id(3)
                .map(UserId)
                .and_then(|uid| state.account(uid))
                .map(|a| Assignee {
                    id: a.user.id,
                    email: Some(a.user.email.clone()),
                });
            with_task(state, id(1), |_, task| {
                task.assignee = Some(assignee.ok_or_else(|| error(404, "User not found"))?);
                Ok(())
            })
        }
        (Method::Post, ["tasks", _, "unassign"]) => with_task(state, id(1), |_, task| {
            task.assignee = None;
            Ok(())
        }),

        _ => error(404, &format!("Cannot {} {}", request.method, request.path)),
    }
}

fn set_completed(task: &mut Task, completed: bool) {
    task.completed = completed;
    task.completed_at = completed.then(|| timestamp(task.id.0 + 1000));
}

/// Look up a task, let `apply` modify it, and respond with the rendered result.
fn with_task(
    state: &mut State,
    id: Option<u64>,
    apply: impl FnOnce(&State, &mut Task) -> Result<(), ApiResponse>,
) -> ApiResponse {
    let Some(key) = id.map(TaskId) else {
        return error(404, "Task not found");
    };
    let Some(mut task) = state.tasks.get(&key).cloned() else {
        return error(404, "Task not found");
    };
    if let Err(response) = apply(state, &mut task) {
        return response;
    }
    state.tasks.insert(key, task.clone());
    respond(200, state.render_task(&task))
}
