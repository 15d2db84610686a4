//! User-visible notices for completed or failed writes.
//!
//! Every mutation produces exactly one `Notice`. Notices are broadcast to
//! subscribers and kept in a bounded history so a front end that was not
//! listening can still show what happened.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::http::ApiError;

/// Maximum history entries to keep
const MAX_HISTORY_ENTRIES: usize = 100;

/// Capacity of the notice broadcast channel
const NOTICE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    /// Get icon/prefix for this level
    pub fn icon(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "✓",
            NoticeLevel::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Success".to_string(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Failure notice: `"<action>: <server message>"`, or just the action
    /// when the server gave no message.
    pub fn failure(action: &str, error: &ApiError) -> Self {
        let detail = error.message();
        let message = if detail.is_empty() {
            action.to_string()
        } else {
            format!("{}: {}", action, detail)
        };
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            message,
            created_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.level.icon(), self.message)
    }
}

/// Broadcast channel plus bounded history of notices.
pub struct NoticeBoard {
    history: Mutex<VecDeque<Notice>>,
    sender: broadcast::Sender<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            history: Mutex::new(VecDeque::new()),
            sender,
        }
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<Notice>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::debug!(message = %notice.message, "Notice"),
            NoticeLevel::Error => tracing::info!(message = %notice.message, "Error notice"),
        }
        {
            let mut history = self.history();
            if history.len() >= MAX_HISTORY_ENTRIES {
                history.pop_front();
            }
            history.push_back(notice.clone());
        }
        let _ = self.sender.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Most recent notice, if any.
    pub fn latest(&self) -> Option<Notice> {
        self.history().back().cloned()
    }

    /// All retained notices, oldest first.
    pub fn recent(&self) -> Vec<Notice> {
        self.history().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.history().clear();
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}
