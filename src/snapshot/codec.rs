//! Dataset codec
//!
//! Converts the live dataset, reached through the repositories in
//! [`Storage`], to and from a [`SnapshotDocument`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::document::{EntityCollections, SnapshotDocument, SnapshotMetadata};
use super::kind::{EntityKind, IMPORT_ORDER};
use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::{EntityRepository, Storage};

/// Schema version written by this build.
///
/// v1 had no user preferences block; v2 added it.
pub const SCHEMA_VERSION: u32 = 2;

/// Encodes and decodes snapshot documents
#[derive(Debug, Clone)]
pub struct DatasetCodec {
    schema_version: u32,
    app_version: String,
    device_name: String,
}

/// Only the metadata block, everything else is skipped unparsed
#[derive(Deserialize)]
struct MetadataEnvelope {
    #[serde(default)]
    metadata: Option<SnapshotMetadata>,
}

impl DatasetCodec {
    /// Codec stamping the current schema version and this build's version
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: device_name.into(),
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Read the full dataset into a document stamped with current metadata
    pub fn encode(
        &self,
        storage: &Storage,
        created_at: DateTime<Utc>,
    ) -> TrackbookResult<SnapshotDocument> {
        let entity_collections = EntityCollections {
            projects: non_empty(storage.projects.fetch_all()?),
            checklists: non_empty(storage.checklists.fetch_all()?),
            checklist_items: non_empty(storage.checklist_items.fetch_all()?),
            ideas: non_empty(storage.ideas.fetch_all()?),
            tags: non_empty(storage.tags.fetch_all()?),
            idea_tags: non_empty(storage.idea_tags.fetch_all()?),
            expenses: non_empty(storage.expenses.fetch_all()?),
            expense_categories: non_empty(storage.expense_categories.fetch_all()?),
            notes: non_empty(storage.notes.fetch_all()?),
            documents: non_empty(storage.documents.fetch_all()?),
            reminders: non_empty(storage.reminders.fetch_all()?),
            work_logs: non_empty(storage.work_logs.fetch_all()?),
        };

        Ok(SnapshotDocument {
            metadata: SnapshotMetadata {
                created_at,
                app_version: self.app_version.clone(),
                device_name: self.device_name.clone(),
                schema_version: self.schema_version,
            },
            user_preferences: storage.preferences.load()?,
            entity_collections,
        })
    }

    /// Serialize a document as pretty-printed JSON
    pub fn to_bytes(&self, document: &SnapshotDocument) -> TrackbookResult<Vec<u8>> {
        serde_json::to_vec_pretty(document)
            .map_err(|e| TrackbookError::Json(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Parse a serialized document
    pub fn decode(&self, bytes: &[u8]) -> TrackbookResult<SnapshotDocument> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| TrackbookError::MalformedDocument(e.to_string()))?;

        let object = value.as_object().ok_or_else(|| {
            TrackbookError::MalformedDocument("top level is not a JSON object".into())
        })?;

        match object.get("metadata") {
            None | Some(serde_json::Value::Null) => return Err(TrackbookError::MissingMetadata),
            Some(_) => {}
        }

        serde_json::from_value(value).map_err(|e| TrackbookError::MalformedDocument(e.to_string()))
    }

    /// Parse only the metadata block
    pub fn decode_metadata(&self, bytes: &[u8]) -> TrackbookResult<SnapshotMetadata> {
        let envelope: MetadataEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| TrackbookError::MalformedDocument(e.to_string()))?;
        envelope.metadata.ok_or(TrackbookError::MissingMetadata)
    }

    /// Delete every entity, children before parents
    pub fn wipe(&self, storage: &Storage) -> TrackbookResult<()> {
        for kind in IMPORT_ORDER.iter().rev() {
            match kind {
                EntityKind::Projects => storage.projects.delete_all()?,
                EntityKind::Checklists => storage.checklists.delete_all()?,
                EntityKind::ChecklistItems => storage.checklist_items.delete_all()?,
                EntityKind::Ideas => storage.ideas.delete_all()?,
                EntityKind::Tags => storage.tags.delete_all()?,
                EntityKind::IdeaTags => storage.idea_tags.delete_all()?,
                EntityKind::Expenses => storage.expenses.delete_all()?,
                EntityKind::ExpenseCategories => storage.expense_categories.delete_all()?,
                EntityKind::Notes => storage.notes.delete_all()?,
                EntityKind::Documents => storage.documents.delete_all()?,
                EntityKind::Reminders => storage.reminders.delete_all()?,
                EntityKind::WorkLogs => storage.work_logs.delete_all()?,
            }
        }
        Ok(())
    }

    /// Insert every collection of `document`, parents before children
    ///
    /// Expects an empty store. Returns the number of entities inserted per
    /// collection, in import order.
    pub fn load(
        &self,
        storage: &Storage,
        document: &SnapshotDocument,
    ) -> TrackbookResult<Vec<(EntityKind, usize)>> {
        let c = &document.entity_collections;
        let mut loaded = Vec::with_capacity(IMPORT_ORDER.len());

        for kind in IMPORT_ORDER {
            let count = match kind {
                EntityKind::Projects => insert_all(&*storage.projects, &c.projects),
                EntityKind::Checklists => insert_all(&*storage.checklists, &c.checklists),
                EntityKind::ChecklistItems => {
                    insert_all(&*storage.checklist_items, &c.checklist_items)
                }
                EntityKind::Ideas => insert_all(&*storage.ideas, &c.ideas),
                EntityKind::Tags => insert_all(&*storage.tags, &c.tags),
                EntityKind::IdeaTags => insert_all(&*storage.idea_tags, &c.idea_tags),
                EntityKind::Expenses => insert_all(&*storage.expenses, &c.expenses),
                EntityKind::ExpenseCategories => {
                    insert_all(&*storage.expense_categories, &c.expense_categories)
                }
                EntityKind::Notes => insert_all(&*storage.notes, &c.notes),
                EntityKind::Documents => insert_all(&*storage.documents, &c.documents),
                EntityKind::Reminders => insert_all(&*storage.reminders, &c.reminders),
                EntityKind::WorkLogs => insert_all(&*storage.work_logs, &c.work_logs),
            }?;
            debug!(collection = kind.as_str(), count, "loaded collection");
            loaded.push((kind, count));
        }

        storage.preferences.store(&document.user_preferences)?;
        Ok(loaded)
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn insert_all<T: Clone>(
    repo: &dyn EntityRepository<T>,
    items: &Option<Vec<T>>,
) -> TrackbookResult<usize> {
    let Some(items) = items else {
        return Ok(0);
    };
    for item in items {
        repo.insert(item.clone())?;
    }
    Ok(items.len())
}
