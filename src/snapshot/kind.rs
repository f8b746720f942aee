//! Entity collection kinds and their load order

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entity collection of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Projects,
    ExpenseCategories,
    Tags,
    Checklists,
    ChecklistItems,
    Ideas,
    IdeaTags,
    Expenses,
    Notes,
    Documents,
    Reminders,
    WorkLogs,
}

/// Order in which collections are loaded into an empty store.
///
/// Every collection appears after the collections it references: projects
/// before checklists before checklist items, ideas and tags before the
/// idea-tag links, expense categories before expenses. Wiping runs in the
/// reverse order. This list, not the field order of the serialized document,
/// is what import relies on.
pub const IMPORT_ORDER: [EntityKind; 12] = [
    EntityKind::Projects,
    EntityKind::ExpenseCategories,
    EntityKind::Tags,
    EntityKind::Checklists,
    EntityKind::ChecklistItems,
    EntityKind::Ideas,
    EntityKind::IdeaTags,
    EntityKind::Expenses,
    EntityKind::Notes,
    EntityKind::Documents,
    EntityKind::Reminders,
    EntityKind::WorkLogs,
];

impl EntityKind {
    /// Stable snake_case name, also used as the collection file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::ExpenseCategories => "expense_categories",
            Self::Tags => "tags",
            Self::Checklists => "checklists",
            Self::ChecklistItems => "checklist_items",
            Self::Ideas => "ideas",
            Self::IdeaTags => "idea_tags",
            Self::Expenses => "expenses",
            Self::Notes => "notes",
            Self::Documents => "documents",
            Self::Reminders => "reminders",
            Self::WorkLogs => "work_logs",
        }
    }

    /// Collections that must already be loaded before this one
    pub fn parents(&self) -> &'static [EntityKind] {
        match self {
            Self::Projects | Self::ExpenseCategories | Self::Tags => &[],
            Self::Checklists => &[Self::Projects],
            Self::ChecklistItems => &[Self::Checklists],
            Self::Ideas => &[Self::Projects],
            Self::IdeaTags => &[Self::Ideas, Self::Tags],
            Self::Expenses => &[Self::Projects, Self::ExpenseCategories],
            Self::Notes | Self::Documents | Self::Reminders | Self::WorkLogs => &[Self::Projects],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}
