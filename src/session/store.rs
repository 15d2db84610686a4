//! Durable storage for the access-token slot.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::Result;
use crate::config::{self, TaskflowState};

/// Storage for the single access-token slot.
///
/// Implementations must make a `save` or `clear` visible to the next `load`.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored token.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token.
    fn clear(&self) -> Result<()>;
}

/// Process-local store, used in tests and when persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token slot backed by `state.kdl`.
///
/// The file also carries the saved refresh cookies; each write is a
/// read-modify-write so the two never clobber each other.
#[derive(Debug, Clone)]
pub struct StateFileStore {
    path: PathBuf,
}

impl StateFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (`TF_DATA_DIR` or `~/.local/share/taskflow`).
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(config::state_kdl_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_state(&self) -> Result<TaskflowState> {
        let doc = config::read_kdl(&self.path)?;
        Ok(TaskflowState::from_kdl(&doc))
    }

    pub fn write_state(&self, state: &TaskflowState) -> Result<()> {
        config::write_state_kdl(&self.path, &state.to_kdl())
    }

    fn update(&self, apply: impl FnOnce(&mut TaskflowState)) -> Result<()> {
        let mut state = self.read_state()?;
        apply(&mut state);
        state.saved_at = Some(chrono::Utc::now());
        self.write_state(&state)
    }

    /// Saved `Set-Cookie` strings for the API host.
    pub fn load_cookies(&self) -> Result<Vec<String>> {
        Ok(self.read_state()?.cookies)
    }

    pub fn save_cookies(&self, cookies: Vec<String>) -> Result<()> {
        self.update(|state| state.cookies = cookies)
    }
}

impl TokenStore for StateFileStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.read_state()?.access_token)
    }

    fn save(&self, token: &str) -> Result<()> {
        self.update(|state| state.access_token = Some(token.to_string()))
    }

    fn clear(&self) -> Result<()> {
        self.update(|state| state.access_token = None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("a").unwrap();
        assert_eq!(store.load().unwrap(), Some("a".to_string()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_state_file_missing_means_no_token() {
        let dir = TempDir::new().unwrap();
        let store = StateFileStore::new(dir.path().join("state.kdl"));
        assert_eq!(store.load().unwrap(), None);
        assert!(store.load_cookies().unwrap().is_empty());
    }

    #[test]
    fn test_state_file_token_and_cookies_coexist() {
        let dir = TempDir::new().unwrap();
        let store = StateFileStore::new(dir.path().join("nested").join("state.kdl"));

        store.save("tok-1").unwrap();
        store
            .save_cookies(vec!["refresh_token=r1; HttpOnly".to_string()])
            .unwrap();
        store.save("tok-2").unwrap();

        assert_eq!(store.load().unwrap(), Some("tok-2".to_string()));
        assert_eq!(
            store.load_cookies().unwrap(),
            vec!["refresh_token=r1; HttpOnly".to_string()]
        );

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load_cookies().unwrap().len(), 1);
        assert!(store.read_state().unwrap().saved_at.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_state_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = StateFileStore::new(dir.path().join("state.kdl"));
        store.save("secret").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, config::STATE_FILE_MODE);
    }
}
