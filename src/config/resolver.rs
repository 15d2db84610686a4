//! Precedence resolution for configuration.
//!
//! ## API URL Precedence (highest to lowest)
//!
//! 1. `--api-url` CLI flag
//! 2. `TASKFLOW_API_URL` environment variable
//! 3. config.kdl
//! 4. Built-in default
//!
//! ## Other Preferences (highest to lowest)
//!
//! 1. CLI flags
//! 2. config.kdl
//! 3. Built-in defaults

use std::time::Duration;

use crate::config::{OutputFormat, TaskflowConfig};
use crate::http::transport::DEFAULT_TIMEOUT_SECS;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "TASKFLOW_API_URL";

/// API used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://task-manager-api-o835.onrender.com";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    Config,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Config => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_url: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
    pub timeout_secs: Resolved<u64>,
    pub log_file: Option<Resolved<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_url: Resolved::new(DEFAULT_API_URL.to_string(), ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            timeout_secs: Resolved::new(DEFAULT_TIMEOUT_SECS, ValueSource::Default),
            log_file: None,
        }
    }
}

impl ResolvedConfig {
    pub fn api_url(&self) -> &str {
        &self.api_url.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }

    pub fn log_file(&self) -> Option<&str> {
        self.log_file.as_ref().map(|r| r.value.as_str())
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Resolve configuration with full precedence chain.
///
/// `env` is consulted for `TASKFLOW_API_URL`; empty values count as unset.
pub fn resolve_config(
    config: &TaskflowConfig,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    // Resolve api_url
    if let Some(ref url) = overrides.api_url {
        result.api_url = Resolved::new(url.clone(), ValueSource::CliFlag);
    } else if let Some(url) = env(API_URL_ENV).filter(|v| !v.is_empty()) {
        result.api_url = Resolved::new(url, ValueSource::EnvVar(API_URL_ENV.to_string()));
    } else if let Some(ref url) = config.api_url {
        result.api_url = Resolved::new(url.clone(), ValueSource::Config);
    }

    // Resolve output_format
    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = config.output_format {
        result.output_format = Resolved::new(format, ValueSource::Config);
    }

    if let Some(secs) = config.timeout_secs {
        result.timeout_secs = Resolved::new(secs, ValueSource::Config);
    }

    if let Some(ref path) = config.log_file {
        result.log_file = Some(Resolved::new(path.clone(), ValueSource::Config));
    }

    result
}
