//! Activity entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of dataset-level activity worth keeping a history of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Export,
    Import,
    ImportRolledBack,
    CloudBackup,
    CloudRestore,
    CloudDelete,
    Wipe,
    LogCleanup,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Export => write!(f, "EXPORT"),
            Action::Import => write!(f, "IMPORT"),
            Action::ImportRolledBack => write!(f, "IMPORT_ROLLED_BACK"),
            Action::CloudBackup => write!(f, "CLOUD_BACKUP"),
            Action::CloudRestore => write!(f, "CLOUD_RESTORE"),
            Action::CloudDelete => write!(f, "CLOUD_DELETE"),
            Action::Wipe => write!(f, "WIPE"),
            Action::LogCleanup => write!(f, "LOG_CLEANUP"),
        }
    }
}

/// A single activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// When the activity happened (UTC)
    pub timestamp: DateTime<Utc>,

    pub action: Action,

    /// Short human-readable detail (file name, counts, failure reason)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl ActivityEntry {
    pub fn new(action: Action, detail: impl Into<String>) -> Self {
        Self::at(Utc::now(), action, detail)
    }

    pub fn at(timestamp: DateTime<Utc>, action: Action, detail: impl Into<String>) -> Self {
        Self {
            timestamp,
            action,
            detail: detail.into(),
        }
    }

    /// One-line rendering for terminal output
    pub fn format_human_readable(&self) -> String {
        let mut line = format!(
            "{} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action
        );
        if !self.detail.is_empty() {
            line.push_str(": ");
            line.push_str(&self.detail);
        }
        line
    }
}
