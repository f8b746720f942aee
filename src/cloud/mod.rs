//! Cloud backups for Trackbook
//!
//! Backup snapshots live in a folder that an external sync client keeps in
//! step across devices. This module provides:
//!
//! - `CloudAccount`: whether a synchronized folder is available at all
//! - `FileCoordinator`: the only path through which the folder is touched
//! - `CloudSnapshotStore`: create, list, delete, fetch and restore backups
//! - `RetentionPolicy`: the count and age bounds applied after each backup

mod account;
mod coordination;
mod record;
mod retention;
mod store;

pub use account::{CloudAccount, SyncFolderAccount};
pub use coordination::{FileCoordinator, LockFileCoordinator, LOCK_FILE_NAME};
pub use record::BackupRecord;
pub use retention::RetentionPolicy;
pub use store::{CloudSnapshotStore, DeleteReport, BACKUP_FOLDER};
