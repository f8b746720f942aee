//! Notes, document metadata, reminders and work logs
//!
//! These are the project "journal" entities: each belongs to a project and
//! carries no children of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, NoteId, ProjectId, ReminderId, WorkLogId};

/// A free-form note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new(),
            project_id,
            title: title.into(),
            body: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Metadata of an attached document; the file contents live outside the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    pub added_at: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn new(project_id: ProjectId, file_name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            project_id,
            file_name: file_name.into(),
            mime_type: None,
            size_bytes: 0,
            added_at: Utc::now(),
        }
    }
}

/// A dated reminder, optionally tied to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub title: String,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

impl Reminder {
    pub fn new(title: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            id: ReminderId::new(),
            project_id: None,
            title: title.into(),
            due_at,
            completed: false,
        }
    }
}

/// Time spent on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: WorkLogId,
    pub project_id: ProjectId,
    pub started_at: DateTime<Utc>,
    pub minutes: u32,
    #[serde(default)]
    pub summary: String,
}

impl WorkLog {
    pub fn new(project_id: ProjectId, started_at: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            id: WorkLogId::new(),
            project_id,
            started_at,
            minutes,
            summary: String::new(),
        }
    }
}
