//! Configuration and state management for TaskFlow.
//!
//! This module defines KDL schemas for two distinct files:
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/taskflow/config.kdl` (or `$TF_CONFIG_DIR/config.kdl`).
//!
//! Contains:
//! - `api-url` - Base URL of the API
//! - `output-format` - "json" or "human"
//! - `timeout-secs` - Per-request timeout
//! - `log-file` - Optional log file
//!
//! ## state.kdl - Runtime state (contains secrets)
//!
//! Located at `~/.local/share/taskflow/state.kdl` (or `$TF_DATA_DIR/state.kdl`).
//!
//! Contains:
//! - `access-token` - The persisted access-token slot
//! - `cookie` - Refresh cookies set by the API (one node each)
//! - `saved-at` - ISO 8601 timestamp of the last write
//!
//! ## Security
//!
//! `state.kdl` MUST be created with 0600 permissions (owner read/write only).
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    API_URL_ENV, ConfigOverrides, DEFAULT_API_URL, Resolved, ResolvedConfig, ValueSource,
    resolve_config,
};
pub use schema::{CONFIG_KEYS, OutputFormat, TaskflowConfig, TaskflowState};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};

use kdl::KdlDocument;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Overrides the directory holding state.kdl.
pub const DATA_DIR_ENV: &str = "TF_DATA_DIR";

/// Overrides the directory holding config.kdl.
pub const CONFIG_DIR_ENV: &str = "TF_CONFIG_DIR";

const APP_DIR: &str = "taskflow";

fn dir_from_env(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding state.kdl.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = dir_from_env(DATA_DIR_ENV) {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
}

/// Directory holding config.kdl.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = dir_from_env(CONFIG_DIR_ENV) {
        return Ok(dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

pub fn state_kdl_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("state.kdl"))
}

pub fn config_kdl_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.kdl"))
}

/// Read a KDL file. A missing file is an empty document.
pub fn read_kdl(path: &Path) -> Result<KdlDocument> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KdlDocument::new()),
        Err(e) => return Err(e.into()),
    };
    text.parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Read config.kdl from its default location.
pub fn read_config() -> Result<TaskflowConfig> {
    Ok(TaskflowConfig::from_kdl(&read_kdl(&config_kdl_path()?)?))
}

/// Write config.kdl to its default location, returning the path written.
pub fn write_config(config: &TaskflowConfig) -> Result<PathBuf> {
    let path = config_kdl_path()?;
    #[cfg(unix)]
    write_kdl(&path, &config.to_kdl(), CONFIG_FILE_MODE)?;
    #[cfg(not(unix))]
    write_kdl(&path, &config.to_kdl())?;
    Ok(path)
}

/// Write state.kdl, owner-only on unix.
pub fn write_state_kdl(path: &Path, doc: &KdlDocument) -> Result<()> {
    #[cfg(unix)]
    return write_kdl(path, doc, STATE_FILE_MODE);
    #[cfg(not(unix))]
    return write_kdl(path, doc);
}

#[cfg(unix)]
fn write_kdl(path: &Path, doc: &KdlDocument, mode: u32) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    create_parent(path)?;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // `mode` only applies on creation; tighten files that already existed.
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    file.write_all(doc.to_string().as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_kdl(path: &Path, doc: &KdlDocument) -> Result<()> {
    create_parent(path)?;
    let mut file = fs::File::create(path)?;
    file.write_all(doc.to_string().as_bytes())?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
