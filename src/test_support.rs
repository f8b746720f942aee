//! Shared fixtures for unit tests

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use crate::config::paths::TrackbookPaths;
use crate::models::{
    Checklist, ChecklistItem, DocumentMeta, Expense, ExpenseCategory, Idea, IdeaTagLink, Note,
    Project, Reminder, Tag, WorkLog,
};
use crate::storage::Storage;

/// A storage rooted in its own temp directory
pub struct TestEnv {
    pub temp: TempDir,
    pub paths: TrackbookPaths,
    pub storage: Storage,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let paths = TrackbookPaths::with_base_dir(temp.path().to_path_buf());
        let storage = Storage::new(paths.clone()).unwrap();
        Self {
            temp,
            paths,
            storage,
        }
    }

    /// Move the storage out, for code that needs `Arc<Storage>`
    pub fn into_shared(self) -> (TempDir, TrackbookPaths, Arc<Storage>) {
        (self.temp, self.paths, Arc::new(self.storage))
    }
}

/// Fill every collection with a little data
pub fn populated_storage(env: &TestEnv) -> &Storage {
    let storage = &env.storage;
    let project = Project::new("Cabin renovation");
    let checklist = Checklist::new(project.id, "Roof");
    let idea = Idea::new("Skylight");
    let tag = Tag::new("later");
    let category = ExpenseCategory::new("Materials");
    let mut expense = Expense::new(
        project.id,
        12_950,
        NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
    );
    expense.category_id = Some(category.id);

    storage
        .checklist_items
        .insert(ChecklistItem::new(checklist.id, "Order shingles"))
        .unwrap();
    storage
        .idea_tags
        .insert(IdeaTagLink {
            idea_id: idea.id,
            tag_id: tag.id,
        })
        .unwrap();
    storage.notes.insert(Note::new(project.id, "Permits")).unwrap();
    storage
        .documents
        .insert(DocumentMeta::new(project.id, "plan.pdf"))
        .unwrap();
    storage
        .reminders
        .insert(Reminder::new(
            "Call roofer",
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ))
        .unwrap();
    storage
        .work_logs
        .insert(WorkLog::new(project.id, Utc::now(), 90))
        .unwrap();
    storage.expenses.insert(expense).unwrap();
    storage.expense_categories.insert(category).unwrap();
    storage.tags.insert(tag).unwrap();
    storage.ideas.insert(idea).unwrap();
    storage.checklists.insert(checklist).unwrap();
    storage.projects.insert(project).unwrap();
    storage
}

/// "Dataset A": two projects, one checklist, three checklist items
pub fn seed_dataset_a(storage: &Storage) {
    let garden = Project::new("Garden");
    let garage = Project::new("Garage");
    let checklist = Checklist::new(garden.id, "Spring");
    for text in ["Till beds", "Plant peas", "Fix hose"] {
        storage
            .checklist_items
            .insert(ChecklistItem::new(checklist.id, text))
            .unwrap();
    }
    storage.checklists.insert(checklist).unwrap();
    storage.projects.insert(garden).unwrap();
    storage.projects.insert(garage).unwrap();
}
