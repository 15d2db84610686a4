//! Session state and the authenticated request layer.
//!
//! This module provides:
//! - `Session` - the single token slot plus the signed-in user
//! - `TokenStore` - durable storage for the token slot (`state.kdl` or memory)
//! - `SessionClient` - sends requests with the current token and performs the
//!   one-shot refresh-and-retry on 401
//!
//! The session is owned by the application root and injected into the request
//! layer; nothing reads the token from ambient global storage.

pub mod client;
pub mod store;

pub use client::{AuthRetry, SessionClient};
pub use store::{MemoryTokenStore, StateFileStore, TokenStore};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::models::User;

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Lifecycle notifications for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials accepted and profile loaded
    SignedIn(User),
    /// A 401 was resolved by the refresh endpoint
    TokenRefreshed,
    /// The user logged out
    SignedOut,
    /// Refresh failed: the session was cleared and the user must log in again
    LoginRequired,
}

/// Snapshot of the session slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub current_user: Option<User>,
}

/// One active session per client instance.
///
/// Writes are visible to every subsequent `send` immediately. Only the token is
/// persisted; the user record is re-fetched on restore.
pub struct Session {
    state: RwLock<SessionState>,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create a session seeded with whatever token the store holds.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let access_token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load stored access token");
                None
            }
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(SessionState {
                access_token,
                current_user: None,
            }),
            store,
            events,
        }
    }

    /// A session that persists nothing.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().current_user.clone()
    }

    pub fn has_token(&self) -> bool {
        self.read().access_token.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Store a token obtained from login or register.
    pub fn set_token(&self, token: String) {
        self.persist(Some(&token));
        self.write().access_token = Some(token);
    }

    /// Replace the token after a successful refresh.
    pub fn refresh_token(&self, token: String) {
        self.set_token(token);
        self.emit(SessionEvent::TokenRefreshed);
    }

    /// Record the signed-in user.
    pub fn set_user(&self, user: User) {
        self.write().current_user = Some(user.clone());
        self.emit(SessionEvent::SignedIn(user));
    }

    /// Drop the token without announcing anything (failed restore).
    pub fn discard(&self) {
        self.clear();
    }

    /// Voluntary logout.
    pub fn sign_out(&self) {
        self.clear();
        self.emit(SessionEvent::SignedOut);
    }

    /// Irrecoverable authentication failure: clear and send the user to login.
    pub fn expire(&self) {
        self.clear();
        tracing::warn!("Session expired; login required");
        self.emit(SessionEvent::LoginRequired);
    }

    fn clear(&self) {
        self.persist(None);
        *self.write() = SessionState::default();
    }

    fn persist(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.store.save(token),
            None => self.store.clear(),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not persist access token");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is listening for lifecycle changes.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("has_token", &state.access_token.is_some())
            .field("current_user", &state.current_user)
            .finish()
    }
}
