//! `tf config show` / `tf config set`. Both run without contacting the API.

use serde::Serialize;
use std::path::PathBuf;

use super::{Output, json};
use crate::config::{self, Resolved, ResolvedConfig, TaskflowConfig};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

impl ConfigEntry {
    fn from_resolved<T: ToString>(key: &'static str, resolved: &Resolved<T>) -> Self {
        Self {
            key,
            value: resolved.value.to_string(),
            source: resolved.source.to_string(),
        }
    }
}

/// Result of `tf config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShow {
    pub values: Vec<ConfigEntry>,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let width = self.values.iter().map(|e| e.key.len()).max().unwrap_or(0);
        let mut lines: Vec<String> = self
            .values
            .iter()
            .map(|e| format!("{:width$}  {}  ({})", e.key, e.value, e.source))
            .collect();
        lines.push(String::new());
        lines.push(format!("Config file: {}", self.config_path.display()));
        lines.push(format!("State file:  {}", self.state_path.display()));
        lines.join("\n")
    }
}

pub fn show(resolved: &ResolvedConfig) -> Result<ConfigShow> {
    let mut values = vec![
        ConfigEntry::from_resolved("api-url", &resolved.api_url),
        ConfigEntry::from_resolved("output-format", &resolved.output_format),
        ConfigEntry::from_resolved("timeout-secs", &resolved.timeout_secs),
    ];
    if let Some(ref log_file) = resolved.log_file {
        values.push(ConfigEntry::from_resolved("log-file", log_file));
    }
    Ok(ConfigShow {
        values,
        config_path: config::config_kdl_path()?,
        state_path: config::state_kdl_path()?,
    })
}

/// Result of `tf config set`.
#[derive(Debug, Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Validate and store one key in config.kdl.
pub fn set(mut current: TaskflowConfig, key: &str, value: &str) -> Result<ConfigSet> {
    current.set(key, value).map_err(Error::InvalidInput)?;
    let path = config::write_config(&current)?;
    tracing::info!(key, path = %path.display(), "Configuration updated");
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path,
    })
}
