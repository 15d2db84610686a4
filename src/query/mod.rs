//! Query cache with deduplicated fetches and typed invalidation.
//!
//! This module provides:
//! - `QueryKey` / `Invalidate` - the key algebra
//! - `Mutation` - writes and the keys each one invalidates
//! - `QueryClient` - `query(key)` and `mutate(op)` over a shared cache
//!
//! Entries have no time-based expiry. A key goes stale only when a successful
//! mutation invalidates it; the next `query` then refetches. At most one fetch
//! per key is in flight, and every concurrent caller awaits that one fetch.

pub mod cache;
pub mod key;
pub mod mutation;

pub use cache::{EntryState, QueryValue};
pub use key::{Invalidate, QueryKey, TaskListFilter, TaskScope};
pub use mutation::{Mutation, MutationOutcome};

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::api::Api;
use crate::http::ApiError;
use crate::models::{ListParams, Page, Project, ProjectId, Task, TaskId, User};
use crate::notify::{Notice, NoticeBoard};
use crate::session::SessionEvent;
use cache::{Cache, Lookup, SharedFetch};

/// Capacity of the cache event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Cache change notifications for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch committed a new value
    Updated(QueryKey),
    /// A mutation marked this key stale
    Invalidated(QueryKey),
    /// Every entry was dropped (logout)
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Refetch invalidated keys that held data, in the background
    pub refetch_on_invalidate: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refetch_on_invalidate: true,
        }
    }
}

struct Inner {
    api: Api,
    options: QueryOptions,
    cache: Mutex<Cache>,
    next_fetch_id: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
    notices: NoticeBoard,
    session_events: Mutex<broadcast::Receiver<SessionEvent>>,
}

/// Handle to the shared query cache. Clones share one cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(api: Api) -> Self {
        Self::with_options(api, QueryOptions::default())
    }

    pub fn with_options(api: Api, options: QueryOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session_events = Mutex::new(api.session().subscribe());
        Self {
            inner: Arc::new(Inner {
                api,
                options,
                cache: Mutex::new(Cache::default()),
                next_fetch_id: AtomicU64::new(1),
                events,
                notices: NoticeBoard::new(),
                session_events,
            }),
        }
    }

    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CacheEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Drop all cached data when the session has ended since the last call,
    /// so one user's data is never served to the next.
    fn sync_session(&self) {
        let ended = {
            let mut rx = self
                .inner
                .session_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut ended = false;
            loop {
                match rx.try_recv() {
                    Ok(SessionEvent::SignedOut | SessionEvent::LoginRequired) => ended = true,
                    Ok(_) => {}
                    Err(broadcast::error::TryRecvError::Lagged(_)) => ended = true,
                    Err(_) => break,
                }
            }
            ended
        };
        if ended {
            self.reset();
        }
    }

    /// Cached value for `key`, fetching when absent or stale.
    pub async fn query(&self, key: QueryKey) -> Result<QueryValue, ApiError> {
        self.sync_session();

        let fetch = {
            let mut cache = self.cache();
            match cache.lookup(&key) {
                Lookup::Fresh(value) => {
                    tracing::trace!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Lookup::Pending(fetch) => {
                    tracing::trace!(key = %key, "Joining in-flight fetch");
                    fetch
                }
                Lookup::Miss(predecessor) => {
                    let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.fetch(key.clone(), id, predecessor).boxed().shared();
                    cache.begin(key.clone(), id, fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.await;
        if result.is_err() {
            self.sync_session();
        }
        result
    }

    /// Network fetch for `key`; commits to the cache only if still current.
    ///
    /// A superseded fetch for the same key is awaited first, so its request
    /// and this one are never outstanding together.
    fn fetch(
        &self,
        key: QueryKey,
        id: u64,
        predecessor: Option<SharedFetch>,
    ) -> impl Future<Output = Result<QueryValue, ApiError>> + Send + 'static {
        let client = self.clone();
        async move {
            if let Some(predecessor) = predecessor {
                tracing::trace!(key = %key, fetch_id = id, "Waiting for superseded fetch");
                let _ = predecessor.await;
            }
            tracing::debug!(key = %key, fetch_id = id, "Fetching");
            let result = client.load(&key).await;
            let committed = client.cache().settle(&key, id, &result);
            if committed {
                client.emit(CacheEvent::Updated(key));
            } else if result.is_ok() {
                tracing::debug!(key = %key, fetch_id = id, "Discarding superseded fetch result");
            }
            result
        }
    }

    async fn load(&self, key: &QueryKey) -> Result<QueryValue, ApiError> {
        let api = &self.inner.api;
        Ok(match key {
            QueryKey::ProjectList(params) => QueryValue::Projects(Arc::new(api.projects(params).await?)),
            QueryKey::ProjectDetail(id) => QueryValue::Project(Arc::new(api.project(*id).await?)),
            QueryKey::TaskList(filter) => {
                let page = match filter.scope {
                    TaskScope::Own => api.tasks(&filter.params).await?,
                    TaskScope::AdminAll => api.all_tasks(&filter.params).await?,
                };
                QueryValue::Tasks(Arc::new(page))
            }
            QueryKey::TaskDetail(id) => QueryValue::Task(Arc::new(api.task(*id).await?)),
            QueryKey::UserList => QueryValue::Users(Arc::new(api.users().await?)),
            QueryKey::Profile => QueryValue::Profile(Arc::new(api.profile().await?)),
        })
    }

    /// Perform a write. On success the affected keys are invalidated before
    /// this returns; refetches run in the background. On failure the cache is
    /// untouched, even when the session ended meanwhile (the reset happens on
    /// the next `query`). Either way a notice is published.
    pub async fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, ApiError> {
        self.sync_session();

        match mutation.execute(&self.inner.api).await {
            Ok(outcome) => {
                self.invalidate(&mutation.invalidations(&outcome));
                self.inner
                    .notices
                    .publish(Notice::success(mutation.success_message(&outcome)));
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Mutation failed");
                self.inner
                    .notices
                    .publish(Notice::failure(mutation.failure_action(), &e));
                Err(e)
            }
        }
    }

    /// Mark matching keys stale and return them.
    pub fn invalidate(&self, patterns: &[Invalidate]) -> Vec<QueryKey> {
        let invalidated = self.cache().invalidate(patterns);

        let mut keys = Vec::with_capacity(invalidated.len());
        for item in invalidated {
            tracing::debug!(key = %item.key, "Invalidated");
            self.emit(CacheEvent::Invalidated(item.key.clone()));
            if item.had_value && self.inner.options.refetch_on_invalidate {
                self.spawn_refetch(item.key.clone());
            }
            keys.push(item.key);
        }
        keys
    }

    fn spawn_refetch(&self, key: QueryKey) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.clone();
        handle.spawn(async move {
            if let Err(e) = client.query(key.clone()).await {
                tracing::debug!(key = %key, error = %e, "Background refetch failed");
            }
        });
    }

    /// Drop every entry. In-flight fetches finish but do not commit.
    pub fn reset(&self) {
        self.cache().clear();
        tracing::debug!("Query cache cleared");
        self.emit(CacheEvent::Cleared);
    }

    pub fn entry_state(&self, key: &QueryKey) -> Option<EntryState> {
        self.cache().state(key)
    }

    pub fn snapshot(&self) -> HashMap<QueryKey, EntryState> {
        self.cache().snapshot()
    }

    // Typed accessors

    pub async fn projects(&self, params: ListParams) -> Result<Arc<Page<Project>>, ApiError> {
        match self.query(QueryKey::ProjectList(params)).await? {
            QueryValue::Projects(page) => Ok(page),
            other => Err(mismatch("project list", &other)),
        }
    }

    pub async fn project(&self, id: ProjectId) -> Result<Arc<Project>, ApiError> {
        match self.query(QueryKey::ProjectDetail(id)).await? {
            QueryValue::Project(project) => Ok(project),
            other => Err(mismatch("project", &other)),
        }
    }

    pub async fn tasks(
        &self,
        scope: TaskScope,
        params: ListParams,
    ) -> Result<Arc<Page<Task>>, ApiError> {
        match self.query(QueryKey::task_list(scope, params)).await? {
            QueryValue::Tasks(page) => Ok(page),
            other => Err(mismatch("task list", &other)),
        }
    }

    pub async fn task(&self, id: TaskId) -> Result<Arc<Task>, ApiError> {
        match self.query(QueryKey::TaskDetail(id)).await? {
            QueryValue::Task(task) => Ok(task),
            other => Err(mismatch("task", &other)),
        }
    }

    pub async fn users(&self) -> Result<Arc<Vec<User>>, ApiError> {
        match self.query(QueryKey::UserList).await? {
            QueryValue::Users(users) => Ok(users),
            other => Err(mismatch("user list", &other)),
        }
    }

    pub async fn profile(&self) -> Result<Arc<User>, ApiError> {
        match self.query(QueryKey::Profile).await? {
            QueryValue::Profile(user) => Ok(user),
            other => Err(mismatch("profile", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &QueryValue) -> ApiError {
    ApiError::Decode(format!("cache held {:?} where a {} was expected", got, expected))
}
