//! Local snapshot store
//!
//! Safety snapshots taken right before a destructive import. They live in a
//! private directory that is never synchronized and never shown to the user;
//! their only purpose is rollback.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::codec::DatasetCodec;
use super::document::SnapshotDocument;
use super::naming::{self, SnapshotKind};
use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::write_bytes_atomic;

/// Stores safety snapshots as JSON files in a private directory
pub struct LocalSnapshotStore {
    dir: PathBuf,
    codec: DatasetCodec,
}

impl LocalSnapshotStore {
    pub fn new(dir: PathBuf, codec: DatasetCodec) -> Self {
        Self { dir, codec }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot and return its path
    ///
    /// Any failure is returned to the caller: without a written safety
    /// snapshot an import must not proceed.
    pub fn save(&self, document: &SnapshotDocument) -> TrackbookResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TrackbookError::Io(format!("Failed to create safety backup directory: {}", e))
        })?;

        let path = naming::unique_path(
            &self.dir,
            SnapshotKind::SafetyBackupBeforeImport,
            document.metadata.created_at,
        );
        let bytes = self.codec.to_bytes(document)?;
        write_bytes_atomic(&path, &bytes)?;

        info!(path = %path.display(), entities = document.total_entities(), "saved safety snapshot");
        Ok(path)
    }

    /// Read one snapshot back
    pub fn load(&self, path: &Path) -> TrackbookResult<SnapshotDocument> {
        let bytes = fs::read(path).map_err(|e| {
            TrackbookError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.codec.decode(&bytes)
    }

    /// Safety snapshot paths, oldest first
    pub fn list(&self) -> TrackbookResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| {
            TrackbookError::Io(format!("Failed to read safety backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                TrackbookError::Io(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(naming::parse_file_name)
                .filter(|name| name.kind == SnapshotKind::SafetyBackupBeforeImport);
            if let Some(name) = name {
                paths.push((name.order_key(), path));
            }
        }

        paths.sort();
        Ok(paths.into_iter().map(|(_, path)| path).collect())
    }

    /// Most recent safety snapshot, if any
    pub fn load_latest(&self) -> TrackbookResult<Option<SnapshotDocument>> {
        match self.list()?.last() {
            Some(path) => self.load(path).map(Some),
            None => Ok(None),
        }
    }

    /// Delete the oldest snapshots so that at most `keep` remain
    pub fn delete_oldest_beyond(&self, keep: usize) -> TrackbookResult<Vec<PathBuf>> {
        let paths = self.list()?;
        let excess = paths.len().saturating_sub(keep);
        let mut deleted = Vec::with_capacity(excess);

        for path in paths.into_iter().take(excess) {
            fs::remove_file(&path).map_err(|e| {
                TrackbookError::Io(format!("Failed to delete old safety backup: {}", e))
            })?;
            debug!(path = %path.display(), "pruned safety snapshot");
            deleted.push(path);
        }

        Ok(deleted)
    }
}
