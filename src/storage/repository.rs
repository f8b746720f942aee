//! Entity repositories
//!
//! Every entity collection is reached through [`EntityRepository`], the
//! `fetch_all` / `insert` / `delete_all` surface the snapshot code treats as a
//! black box. [`JsonRepository`] is the file-backed implementation: the
//! collection lives in memory behind an `RwLock` and is written to its JSON
//! file on `persist`.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::TrackbookError;

use super::file_io::{read_json, write_json_atomic};

/// Collaborator interface for one entity collection
pub trait EntityRepository<T>: Send + Sync {
    /// All entities, in insertion order
    fn fetch_all(&self) -> Result<Vec<T>, TrackbookError>;

    /// Append one entity
    fn insert(&self, entity: T) -> Result<(), TrackbookError>;

    /// Remove every entity
    fn delete_all(&self) -> Result<(), TrackbookError>;

    /// Re-read the backing store, discarding in-memory state
    fn reload(&self) -> Result<(), TrackbookError> {
        Ok(())
    }

    /// Flush in-memory state to the backing store
    fn persist(&self) -> Result<(), TrackbookError> {
        Ok(())
    }
}

/// Serializable collection file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionFile<T> {
    items: Vec<T>,
}

impl<T> Default for CollectionFile<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Repository persisted as one JSON file
pub struct JsonRepository<T> {
    path: PathBuf,
    data: RwLock<Vec<T>>,
}

impl<T> JsonRepository<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a new repository backed by `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(Vec::new()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Number of entities currently held
    pub fn len(&self) -> Result<usize, TrackbookError> {
        let data = self.data.read().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> Result<bool, TrackbookError> {
        Ok(self.len()? == 0)
    }
}

impl<T> EntityRepository<T> for JsonRepository<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    fn fetch_all(&self) -> Result<Vec<T>, TrackbookError> {
        let data = self.data.read().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.clone())
    }

    fn insert(&self, entity: T) -> Result<(), TrackbookError> {
        let mut data = self.data.write().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        data.push(entity);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), TrackbookError> {
        let mut data = self.data.write().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        data.clear();
        Ok(())
    }

    fn reload(&self) -> Result<(), TrackbookError> {
        let file: CollectionFile<T> = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = file.items;
        Ok(())
    }

    fn persist(&self) -> Result<(), TrackbookError> {
        let data = self.data.read().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        let file = CollectionFile {
            items: data.clone(),
        };
        write_json_atomic(&self.path, &file)
    }
}
