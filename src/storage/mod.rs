//! Storage layer for Trackbook
//!
//! Provides JSON file storage with atomic writes and one repository per
//! entity collection. Repositories are held as trait objects so that callers
//! (and tests) can substitute their own implementations.

pub mod file_io;
pub mod preferences;
pub mod repository;

pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};
pub use preferences::{PreferenceStore, SettingsPreferenceStore};
pub use repository::{EntityRepository, JsonRepository};

use crate::config::paths::TrackbookPaths;
use crate::error::TrackbookError;
use crate::models::{
    Checklist, ChecklistItem, DocumentMeta, Expense, ExpenseCategory, Idea, IdeaTagLink, Note,
    Project, Reminder, Tag, WorkLog,
};
use crate::snapshot::EntityKind;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: TrackbookPaths,
    pub projects: Box<dyn EntityRepository<Project>>,
    pub checklists: Box<dyn EntityRepository<Checklist>>,
    pub checklist_items: Box<dyn EntityRepository<ChecklistItem>>,
    pub ideas: Box<dyn EntityRepository<Idea>>,
    pub tags: Box<dyn EntityRepository<Tag>>,
    pub idea_tags: Box<dyn EntityRepository<IdeaTagLink>>,
    pub expenses: Box<dyn EntityRepository<Expense>>,
    pub expense_categories: Box<dyn EntityRepository<ExpenseCategory>>,
    pub notes: Box<dyn EntityRepository<Note>>,
    pub documents: Box<dyn EntityRepository<DocumentMeta>>,
    pub reminders: Box<dyn EntityRepository<Reminder>>,
    pub work_logs: Box<dyn EntityRepository<WorkLog>>,
    pub preferences: Box<dyn PreferenceStore>,
}

impl Storage {
    /// Create a new Storage instance backed by JSON files under `paths`
    pub fn new(paths: TrackbookPaths) -> Result<Self, TrackbookError> {
        paths.ensure_directories()?;

        Ok(Self {
            projects: json_repo(&paths, EntityKind::Projects),
            checklists: json_repo(&paths, EntityKind::Checklists),
            checklist_items: json_repo(&paths, EntityKind::ChecklistItems),
            ideas: json_repo(&paths, EntityKind::Ideas),
            tags: json_repo(&paths, EntityKind::Tags),
            idea_tags: json_repo(&paths, EntityKind::IdeaTags),
            expenses: json_repo(&paths, EntityKind::Expenses),
            expense_categories: json_repo(&paths, EntityKind::ExpenseCategories),
            notes: json_repo(&paths, EntityKind::Notes),
            documents: json_repo(&paths, EntityKind::Documents),
            reminders: json_repo(&paths, EntityKind::Reminders),
            work_logs: json_repo(&paths, EntityKind::WorkLogs),
            preferences: Box::new(SettingsPreferenceStore::new(paths.clone())),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &TrackbookPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), TrackbookError> {
        self.projects.reload()?;
        self.checklists.reload()?;
        self.checklist_items.reload()?;
        self.ideas.reload()?;
        self.tags.reload()?;
        self.idea_tags.reload()?;
        self.expenses.reload()?;
        self.expense_categories.reload()?;
        self.notes.reload()?;
        self.documents.reload()?;
        self.reminders.reload()?;
        self.work_logs.reload()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), TrackbookError> {
        self.projects.persist()?;
        self.checklists.persist()?;
        self.checklist_items.persist()?;
        self.ideas.persist()?;
        self.tags.persist()?;
        self.idea_tags.persist()?;
        self.expenses.persist()?;
        self.expense_categories.persist()?;
        self.notes.persist()?;
        self.documents.persist()?;
        self.reminders.persist()?;
        self.work_logs.persist()?;
        Ok(())
    }
}

fn json_repo<T>(paths: &TrackbookPaths, kind: EntityKind) -> Box<dyn EntityRepository<T>>
where
    T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    Box::new(JsonRepository::new(paths.collection_file(kind)))
}
