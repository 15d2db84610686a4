//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation of user-supplied values
//! - Default values

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted by `tf config set`.
pub const CONFIG_KEYS: &[&str] = &["api-url", "output-format", "timeout-secs", "log-file"];

/// User preferences stored in config.kdl.
///
/// File permissions: 0644 (rw-r--r--)
///
/// # KDL Schema
///
/// ```kdl
/// api-url "https://tasks.example.com"
/// output-format "human"  // or "json"
/// timeout-secs 30
/// log-file "/tmp/taskflow.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskflowConfig {
    /// Base URL of the remote API
    pub api_url: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Per-request timeout
    pub timeout_secs: Option<u64>,

    /// Also write logs to this file
    pub log_file: Option<String>,
}

impl TaskflowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document. Unknown or malformed nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_url: first_string(doc, "api-url"),
            output_format: first_string(doc, "output-format")
                .and_then(|s| OutputFormat::parse(&s)),
            timeout_secs: first_integer(doc, "timeout-secs")
                .and_then(|i| u64::try_from(i).ok())
                .filter(|secs| *secs > 0),
            log_file: first_string(doc, "log-file"),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref url) = self.api_url {
            push_string(&mut doc, "api-url", url);
        }
        if let Some(format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }
        if let Some(secs) = self.timeout_secs {
            let mut node = KdlNode::new("timeout-secs");
            node.push(KdlEntry::new(KdlValue::Integer(secs as i128)));
            doc.nodes_mut().push(node);
        }
        if let Some(ref path) = self.log_file {
            push_string(&mut doc, "log-file", path);
        }

        doc
    }

    /// Set a single key from its textual form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "api-url" => {
                let url = reqwest::Url::parse(value)
                    .map_err(|e| format!("api-url must be a URL: {}", e))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(format!("api-url must be http or https, got '{}'", value));
                }
                self.api_url = Some(value.trim_end_matches('/').to_string());
            }
            "output-format" => {
                self.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    format!("output-format must be 'json' or 'human', got '{}'", value)
                })?);
            }
            "timeout-secs" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| format!("timeout-secs must be a number, got '{}'", value))?;
                if secs == 0 {
                    return Err("timeout-secs must be greater than 0".to_string());
                }
                self.timeout_secs = Some(secs);
            }
            "log-file" => self.log_file = Some(value.to_string()),
            other => {
                return Err(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    other,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }
}

/// Runtime state stored in state.kdl.
///
/// Holds the access token and the refresh cookies, so it is written with
/// 0600 permissions.
///
/// # KDL Schema
///
/// ```kdl
/// access-token "eyJhbGciOi..."
/// cookie "refresh_token=abc; Path=/; HttpOnly"
/// saved-at "2024-01-15T10:30:00Z"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskflowState {
    pub access_token: Option<String>,

    /// Raw `Set-Cookie` strings received from the API
    pub cookies: Vec<String>,

    /// Last time the file was written
    pub saved_at: Option<DateTime<Utc>>,
}

impl TaskflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let cookies = doc
            .nodes()
            .iter()
            .filter(|node| node.name().value() == "cookie")
            .filter_map(|node| node.entries().first())
            .filter_map(|entry| entry.value().as_string())
            .map(str::to_string)
            .collect();

        Self {
            access_token: first_string(doc, "access-token"),
            cookies,
            saved_at: first_string(doc, "saved-at").and_then(|s| s.parse().ok()),
        }
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref token) = self.access_token {
            push_string(&mut doc, "access-token", token);
        }
        for cookie in &self.cookies {
            push_string(&mut doc, "cookie", cookie);
        }
        if let Some(saved_at) = self.saved_at {
            push_string(&mut doc, "saved-at", &saved_at.to_rfc3339());
        }

        doc
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string)
}

fn first_integer(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_integer())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==== OutputFormat Tests ====

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(format!("{}", OutputFormat::Json), "json");
        assert_eq!(format!("{}", OutputFormat::Human), "human");
    }

    // ==== TaskflowConfig Tests ====

    #[test]
    fn test_config_from_kdl_empty() {
        let config = TaskflowConfig::from_kdl(&KdlDocument::new());
        assert_eq!(config, TaskflowConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
api-url "http://localhost:3000"
output-format "human"
timeout-secs 12
log-file "/tmp/tf.log"
"#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = TaskflowConfig::from_kdl(&doc);
        assert_eq!(config.api_url, Some("http://localhost:3000".to_string()));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.timeout_secs, Some(12));
        assert_eq!(config.log_file, Some("/tmp/tf.log".to_string()));
    }

    #[test]
    fn test_config_ignores_bad_values() {
        let doc: KdlDocument = "output-format \"xml\"\ntimeout-secs 0".parse().unwrap();
        let config = TaskflowConfig::from_kdl(&doc);
        assert_eq!(config.output_format, None);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = TaskflowConfig {
            api_url: Some("https://api.example.com".to_string()),
            output_format: Some(OutputFormat::Json),
            timeout_secs: Some(5),
            log_file: None,
        };
        let doc = config.to_kdl();
        assert_eq!(TaskflowConfig::from_kdl(&doc), config);
    }

    #[test]
    fn test_config_set_validates() {
        let mut config = TaskflowConfig::new();
        config.set("api-url", "http://localhost:3000/").unwrap();
        assert_eq!(config.api_url, Some("http://localhost:3000".to_string()));

        assert!(config.set("api-url", "ftp://x").is_err());
        assert!(config.set("output-format", "xml").is_err());
        assert!(config.set("timeout-secs", "0").is_err());
        assert!(config.set("timeout-secs", "soon").is_err());

        let err = config.set("editor", "vim").unwrap_err();
        assert!(err.contains("api-url"));
    }

    // ==== TaskflowState Tests ====

    #[test]
    fn test_state_from_kdl_full() {
        let kdl = r#"
access-token "tok"
cookie "refresh_token=a; Path=/"
cookie "other=b"
saved-at "2024-01-15T10:30:00Z"
"#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let state = TaskflowState::from_kdl(&doc);
        assert_eq!(state.access_token, Some("tok".to_string()));
        assert_eq!(
            state.cookies,
            vec!["refresh_token=a; Path=/".to_string(), "other=b".to_string()]
        );
        assert!(state.saved_at.is_some());
    }

    #[test]
    fn test_state_to_kdl_roundtrip() {
        let state = TaskflowState {
            access_token: Some("secret".to_string()),
            cookies: vec!["refresh_token=x; HttpOnly".to_string()],
            saved_at: Some("2024-01-15T10:30:00Z".parse().unwrap()),
        };
        let text = state.to_kdl().to_string();
        let reparsed: KdlDocument = text.parse().unwrap();
        assert_eq!(TaskflowState::from_kdl(&reparsed), state);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_constants() {
        assert_eq!(STATE_FILE_MODE, 0o600);
        assert_eq!(CONFIG_FILE_MODE, 0o644);
    }
}
