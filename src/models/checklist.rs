//! Checklist and checklist item models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChecklistId, ChecklistItemId, ProjectId};

/// A named checklist belonging to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Checklist {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            id: ChecklistId::new(),
            project_id,
            title: title.into(),
            sort_order: 0,
            created_at: Utc::now(),
        }
    }
}

/// A single line in a checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub checklist_id: ChecklistId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    pub fn new(checklist_id: ChecklistId, text: impl Into<String>) -> Self {
        Self {
            id: ChecklistItemId::new(),
            checklist_id,
            text: text.into(),
            done: false,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }
}
