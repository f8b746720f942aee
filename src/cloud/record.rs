//! Backup record: what a listing knows about one stored snapshot

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotMetadata;

/// Metadata about one cloud snapshot, read without parsing the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Backup filename
    pub file_name: String,
    /// Full path to the file inside the synchronized folder
    pub path: PathBuf,
    /// When the snapshot was taken (from its metadata)
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Device that produced the snapshot
    pub device_name: String,
    /// Application version that produced the snapshot
    pub app_version: String,
    /// Schema version of the snapshot
    pub schema_version: u32,
}

impl BackupRecord {
    pub fn from_metadata(path: PathBuf, size_bytes: u64, metadata: SnapshotMetadata) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            file_name,
            path,
            created_at: metadata.created_at,
            size_bytes,
            device_name: metadata.device_name,
            app_version: metadata.app_version,
            schema_version: metadata.schema_version,
        }
    }
}
