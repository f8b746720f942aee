//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the snapshot, cloud and scheduler layers.

pub mod backup;
pub mod maintenance;
pub mod transfer;

pub use backup::{handle_backup_command, BackupCommands};
pub use maintenance::{handle_maintenance_command, MaintenanceCommands};
pub use transfer::{handle_export_command, handle_import_command, handle_wipe_command};

use std::sync::Arc;

use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::cloud::{CloudSnapshotStore, LockFileCoordinator, SyncFolderAccount};
use crate::config::paths::TrackbookPaths;
use crate::config::settings::Settings;
use crate::error::TrackbookResult;
use crate::scheduler::{FileTaskQueue, JsonStateStore, MaintenanceScheduler, SchedulerState};
use crate::snapshot::{DatasetCodec, LocalSnapshotStore};
use crate::storage::Storage;
use crate::transfer::TransferCoordinator;

/// Everything a command needs, wired from paths and settings
pub struct Services {
    pub paths: TrackbookPaths,
    pub settings: Settings,
    pub storage: Arc<Storage>,
    pub activity: Arc<ActivityLog>,
    pub transfer: Arc<TransferCoordinator>,
    pub cloud: Arc<CloudSnapshotStore>,
    pub scheduler: MaintenanceScheduler,
}

impl Services {
    /// Open the dataset and wire the backup components around it
    pub fn open(paths: TrackbookPaths, settings: Settings) -> TrackbookResult<Self> {
        let storage = Arc::new(Storage::new(paths.clone())?);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let codec = DatasetCodec::new(settings.resolved_device_name());
        let activity = Arc::new(ActivityLog::new(paths.activity_log()));

        let transfer = Arc::new(
            TransferCoordinator::new(
                storage.clone(),
                codec.clone(),
                LocalSnapshotStore::new(paths.safety_backup_dir(), codec.clone()),
                paths.export_dir(),
                activity.clone(),
                clock.clone(),
            )
            .with_safety_keep(settings.safety_keep_count),
        );
        transfer.reload_dataset()?;

        let cloud = Arc::new(CloudSnapshotStore::new(
            Box::new(SyncFolderAccount::new(settings.cloud.resolved_directory())),
            Box::new(LockFileCoordinator::default()),
            codec,
            settings.cloud.retention(),
            clock.clone(),
        ));

        let scheduler = MaintenanceScheduler::new(
            SchedulerState::new(Box::new(JsonStateStore::new(paths.scheduler_state_file()))),
            Arc::new(FileTaskQueue::new(paths.task_queue_file())),
            transfer.clone(),
            cloud.clone(),
            activity.clone(),
            clock,
        )
        .with_log_max_age(settings.activity_log_max_age())
        .with_task_budget(settings.task_budget());

        Ok(Self {
            paths,
            settings,
            storage,
            activity,
            transfer,
            cloud,
            scheduler,
        })
    }
}

/// Format a duration in human-readable form
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Per-collection counts, one indented line each
pub(crate) fn print_counts(counts: &[(crate::snapshot::EntityKind, usize)]) {
    for (kind, count) in counts {
        println!("  {:<20} {}", kind.as_str(), count);
    }
}
