//! Common test utilities for taskflow integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.config/taskflow/` or `~/.local/share/taskflow/` directories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use taskflow::session::{StateFileStore, TokenStore};
pub use tempfile::TempDir;

/// A test environment with isolated config and state directories.
///
/// The `tf()` method returns a `Command` that sets `TF_CONFIG_DIR` and
/// `TF_DATA_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub config_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the tf binary with isolated directories.
    pub fn tf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tf"));
        cmd.env("TF_CONFIG_DIR", self.config_dir.path());
        cmd.env("TF_DATA_DIR", self.data_dir.path());
        cmd.env_remove("TASKFLOW_API_URL");
        cmd.env_remove("TF_PASSWORD");
        cmd.env_remove("TF_LOG");
        cmd
    }

    /// A `tf` command pointed at a mock API.
    pub fn tf_at(&self, server: &httptest::Server) -> Command {
        let mut cmd = self.tf();
        cmd.args(["--api-url", &server.url_str("")]);
        cmd
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.path().join("state.kdl")
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.kdl")
    }

    pub fn state(&self) -> StateFileStore {
        StateFileStore::new(self.state_path())
    }

    /// Pretend a previous `tf login` left a token and refresh cookie behind.
    pub fn signed_in(token: &str) -> Self {
        let env = Self::new();
        let store = env.state();
        store.save(token).unwrap();
        store
            .save_cookies(vec!["refresh_token=r1; Path=/; HttpOnly".to_string()])
            .unwrap();
        env
    }

    pub fn stored_token(&self) -> Option<String> {
        self.state().load().unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn user_json() -> serde_json::Value {
    serde_json::json!({"id": 2, "email": "user@example.com", "role": "USER"})
}

pub fn admin_json() -> serde_json::Value {
    serde_json::json!({"id": 1, "email": "admin@example.com", "role": "ADMIN"})
}
