//! Core data models for Trackbook
//!
//! This module contains all the data structures that represent the project
//! tracking domain: projects, checklists, ideas, expenses, notes, documents,
//! reminders and work logs.

pub mod checklist;
pub mod expense;
pub mod idea;
pub mod ids;
pub mod journal;
pub mod preferences;
pub mod project;

pub use checklist::{Checklist, ChecklistItem};
pub use expense::{Expense, ExpenseCategory};
pub use idea::{Idea, IdeaTagLink, Tag};
pub use ids::{
    ChecklistId, ChecklistItemId, DocumentId, ExpenseCategoryId, ExpenseId, IdeaId, NoteId,
    ProjectId, ReminderId, TagId, WorkLogId,
};
pub use journal::{DocumentMeta, Note, Reminder, WorkLog};
pub use preferences::UserPreferences;
pub use project::{Project, ProjectStatus};
