//! Cloud snapshot store
//!
//! Rotating backups kept in a folder synchronized by an external client.
//! Each operation checks availability first, then touches the folder only
//! through the [`FileCoordinator`]. Retention runs after every new backup.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::account::CloudAccount;
use super::coordination::FileCoordinator;
use super::record::BackupRecord;
use super::retention::RetentionPolicy;
use crate::clock::Clock;
use crate::error::{TrackbookError, TrackbookResult};
use crate::snapshot::naming::{self, SnapshotKind};
use crate::snapshot::{DatasetCodec, SnapshotDocument};
use crate::transfer::{ImportOutcome, TransferCoordinator};

/// Folder created inside the synchronized container
pub const BACKUP_FOLDER: &str = "trackbook-backups";

/// Result of deleting several backups independently
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<BackupRecord>,
    pub failed: Vec<(BackupRecord, TrackbookError)>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manages backup snapshots in the synchronized folder
pub struct CloudSnapshotStore {
    account: Box<dyn CloudAccount>,
    coordinator: Box<dyn FileCoordinator>,
    codec: DatasetCodec,
    retention: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl CloudSnapshotStore {
    pub fn new(
        account: Box<dyn CloudAccount>,
        coordinator: Box<dyn FileCoordinator>,
        codec: DatasetCodec,
        retention: RetentionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            account,
            coordinator,
            codec,
            retention,
            clock,
        }
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Backup folder, or `CloudUnavailable` when no account is signed in
    pub fn backup_dir(&self) -> TrackbookResult<PathBuf> {
        Ok(self.account.container()?.join(BACKUP_FOLDER))
    }

    /// Write a new backup, then apply the retention policy
    ///
    /// Retention failures are logged; they never fail the backup itself.
    pub fn create(&self, document: &SnapshotDocument) -> TrackbookResult<BackupRecord> {
        let dir = self.backup_dir()?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            TrackbookError::Io(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let path = naming::unique_path(&dir, SnapshotKind::Backup, document.metadata.created_at);
        let bytes = self.codec.to_bytes(document)?;
        self.coordinator.write(&path, &bytes)?;

        let record =
            BackupRecord::from_metadata(path, bytes.len() as u64, document.metadata.clone());
        info!(
            file = %record.file_name,
            size = record.size_bytes,
            entities = document.total_entities(),
            "created cloud backup"
        );

        match self.enforce_retention() {
            Ok(expired) if !expired.is_empty() => {
                info!(deleted = expired.len(), "applied cloud retention policy")
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cloud retention pass failed"),
        }

        Ok(record)
    }

    /// All readable backups, newest first
    ///
    /// Files whose metadata cannot be read are skipped.
    pub fn list(&self) -> TrackbookResult<Vec<BackupRecord>> {
        let dir = self.backup_dir()?;
        let mut records = Vec::new();

        for path in self.coordinator.list(&dir)? {
            let bytes = match self.coordinator.read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable backup");
                    continue;
                }
            };
            match self.codec.decode_metadata(&bytes) {
                Ok(metadata) => {
                    records.push(BackupRecord::from_metadata(
                        path,
                        bytes.len() as u64,
                        metadata,
                    ));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparsable backup");
                }
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| naming::compare_file_names(&b.file_name, &a.file_name))
        });
        Ok(records)
    }

    /// Look a backup up by file name
    pub fn find(&self, file_name: &str) -> TrackbookResult<BackupRecord> {
        self.list()?
            .into_iter()
            .find(|r| r.file_name == file_name)
            .ok_or_else(|| TrackbookError::backup_not_found(file_name))
    }

    /// Most recent backup, if any
    pub fn latest(&self) -> TrackbookResult<Option<BackupRecord>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Delete one backup
    pub fn delete(&self, record: &BackupRecord) -> TrackbookResult<()> {
        self.backup_dir()?;
        self.coordinator.delete(&record.path)?;
        debug!(file = %record.file_name, "deleted cloud backup");
        Ok(())
    }

    /// Delete every listed backup; each deletion stands on its own
    pub fn delete_all(&self) -> TrackbookResult<DeleteReport> {
        Ok(self.delete_each(self.list()?))
    }

    /// Full document of one backup
    pub fn fetch(&self, record: &BackupRecord) -> TrackbookResult<SnapshotDocument> {
        self.backup_dir()?;
        let bytes = self.coordinator.read(&record.path)?;
        self.codec.decode(&bytes)
    }

    /// Replace the live dataset with a backup
    ///
    /// Runs the same validate, safety-snapshot, wipe, load and rollback
    /// pipeline as a file import.
    pub fn restore(
        &self,
        record: &BackupRecord,
        transfer: &TransferCoordinator,
    ) -> TrackbookResult<ImportOutcome> {
        let document = self.fetch(record)?;
        transfer.restore_document(document, &record.file_name)
    }

    /// Delete every backup outside the retention policy, best effort
    pub fn enforce_retention(&self) -> TrackbookResult<Vec<BackupRecord>> {
        let records = self.list()?;
        let expired = self.retention.expired(&records, self.clock.now());
        let report = self.delete_each(expired);

        for (record, e) in &report.failed {
            warn!(file = %record.file_name, error = %e, "failed to delete expired backup");
        }
        Ok(report.deleted)
    }

    fn delete_each(&self, records: Vec<BackupRecord>) -> DeleteReport {
        let mut report = DeleteReport::default();
        for record in records {
            match self.coordinator.delete(&record.path) {
                Ok(()) => {
                    debug!(file = %record.file_name, "deleted cloud backup");
                    report.deleted.push(record);
                }
                Err(e) => report.failed.push((record, e)),
            }
        }
        report
    }
}
