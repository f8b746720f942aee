//! Snapshot document format
//!
//! A snapshot is a single JSON document holding metadata, user preferences and
//! one optional array per entity collection. Collections with nothing in them
//! are omitted rather than written as empty arrays, so older readers never see
//! keys they don't know about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, IMPORT_ORDER};
use crate::models::{
    Checklist, ChecklistItem, DocumentMeta, Expense, ExpenseCategory, Idea, IdeaTagLink, Note,
    Project, Reminder, Tag, UserPreferences, WorkLog,
};

/// Who produced a snapshot, when, and with which schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub app_version: String,
    pub device_name: String,
    pub schema_version: u32,
}

/// One optional, ordered sequence per entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCollections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklists: Option<Vec<Checklist>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_items: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideas: Option<Vec<Idea>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea_tags: Option<Vec<IdeaTagLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<Expense>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_categories: Option<Vec<ExpenseCategory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Vec<Reminder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_logs: Option<Vec<WorkLog>>,
}

impl EntityCollections {
    /// Number of entities in one collection (0 when omitted)
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Projects => len(&self.projects),
            EntityKind::Checklists => len(&self.checklists),
            EntityKind::ChecklistItems => len(&self.checklist_items),
            EntityKind::Ideas => len(&self.ideas),
            EntityKind::Tags => len(&self.tags),
            EntityKind::IdeaTags => len(&self.idea_tags),
            EntityKind::Expenses => len(&self.expenses),
            EntityKind::ExpenseCategories => len(&self.expense_categories),
            EntityKind::Notes => len(&self.notes),
            EntityKind::Documents => len(&self.documents),
            EntityKind::Reminders => len(&self.reminders),
            EntityKind::WorkLogs => len(&self.work_logs),
        }
    }
}

fn len<T>(items: &Option<Vec<T>>) -> usize {
    items.as_ref().map_or(0, Vec::len)
}

/// The unit of export, import and backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub metadata: SnapshotMetadata,
    #[serde(default)]
    pub user_preferences: UserPreferences,
    #[serde(default)]
    pub entity_collections: EntityCollections,
}

impl SnapshotDocument {
    /// Per-collection entity counts, in import order
    pub fn counts(&self) -> Vec<(EntityKind, usize)> {
        IMPORT_ORDER
            .iter()
            .map(|kind| (*kind, self.entity_collections.count(*kind)))
            .collect()
    }

    /// Total number of entities across all collections
    pub fn total_entities(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }

    /// Human-readable one-line summary of what the snapshot holds
    pub fn summary(&self) -> String {
        let present: Vec<String> = self
            .counts()
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect();

        if present.is_empty() {
            format!("Empty snapshot (v{})", self.metadata.schema_version)
        } else {
            format!(
                "Snapshot v{}: {}",
                self.metadata.schema_version,
                present.join(", ")
            )
        }
    }
}
