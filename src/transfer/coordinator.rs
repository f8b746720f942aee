//! Import/export coordinator
//!
//! Every whole-dataset operation goes through here. Import and restore run
//! as a gated pipeline:
//!
//! 1. decode the incoming document
//! 2. refuse a schema newer than this build understands
//! 3. save a safety snapshot of the live dataset
//! 4. wipe the live collections
//! 5. load the incoming collections in dependency order
//!
//! A failure in 4 or 5 reloads the safety snapshot before the original error
//! is returned. If that reload fails too the caller gets `RollbackFailed`.
//!
//! Wipe and reload are not atomic against readers, so mutating operations
//! hold the gate exclusively and are rejected with `Busy` rather than queued.
//! The gate has two layers: an in-memory lock for this process's threads and
//! a [`DatasetLock`] on disk for other processes on the same data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use tracing::{error, info, warn};

use crate::activity::{Action, ActivityEntry, ActivityLog};
use crate::clock::Clock;
use crate::cloud::{BackupRecord, CloudSnapshotStore};
use crate::error::{TrackbookError, TrackbookResult};
use crate::snapshot::naming::{self, SnapshotKind};
use crate::snapshot::{DatasetCodec, EntityKind, LocalSnapshotStore, SnapshotDocument};
use crate::storage::{write_bytes_atomic, Storage};

use super::lock::{DatasetGuard, DatasetLock};

/// Safety snapshots kept after a successful import
pub const DEFAULT_SAFETY_KEEP: usize = 3;

/// What a successful import or restore did
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Schema version of the imported document
    pub schema_version: u32,
    /// Safety snapshot taken before the live data was replaced
    pub safety_snapshot: PathBuf,
    /// Entities loaded per collection, in load order
    pub loaded: Vec<(EntityKind, usize)>,
    /// Older safety snapshots removed afterwards
    pub pruned: Vec<PathBuf>,
}

impl ImportOutcome {
    pub fn total_loaded(&self) -> usize {
        self.loaded.iter().map(|(_, n)| n).sum()
    }
}

/// Orchestrates export, import, restore and wipe of the live dataset
pub struct TransferCoordinator {
    storage: Arc<Storage>,
    codec: DatasetCodec,
    safety: LocalSnapshotStore,
    export_dir: PathBuf,
    activity: Arc<ActivityLog>,
    clock: Arc<dyn Clock>,
    safety_keep: usize,
    gate: RwLock<()>,
    dataset_lock: DatasetLock,
}

impl TransferCoordinator {
    pub fn new(
        storage: Arc<Storage>,
        codec: DatasetCodec,
        safety: LocalSnapshotStore,
        export_dir: PathBuf,
        activity: Arc<ActivityLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dataset_lock = DatasetLock::new(storage.paths().base_dir());
        Self {
            storage,
            codec,
            safety,
            export_dir,
            activity,
            clock,
            safety_keep: DEFAULT_SAFETY_KEEP,
            gate: RwLock::new(()),
            dataset_lock,
        }
    }

    /// Number of safety snapshots to keep after a successful import
    pub fn with_safety_keep(mut self, keep: usize) -> Self {
        self.safety_keep = keep;
        self
    }

    pub fn codec(&self) -> &DatasetCodec {
        &self.codec
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Re-read every collection from disk, unless another process is
    /// replacing them
    pub fn reload_dataset(&self) -> TrackbookResult<()> {
        let _shared = self.shared("load the dataset")?;
        self.storage.load_all()
    }

    /// Encode the live dataset
    pub fn export_document(&self) -> TrackbookResult<SnapshotDocument> {
        let _shared = self.shared("export")?;
        self.codec.encode(&self.storage, self.clock.now())
    }

    /// Export to a timestamped file in the export directory
    pub fn export(&self) -> TrackbookResult<PathBuf> {
        fs::create_dir_all(&self.export_dir).map_err(|e| {
            TrackbookError::Io(format!("Failed to create export directory: {}", e))
        })?;
        let path = naming::unique_path(&self.export_dir, SnapshotKind::Export, self.clock.now());
        self.export_to(&path)
    }

    /// Export to a caller-chosen path
    pub fn export_to(&self, path: &Path) -> TrackbookResult<PathBuf> {
        let document = self.export_document()?;
        let bytes = self.codec.to_bytes(&document)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_bytes_atomic(path, &bytes)?;

        info!(path = %path.display(), entities = document.total_entities(), "exported dataset");
        self.activity.record_quietly(ActivityEntry::at(
            self.clock.now(),
            Action::Export,
            path.display().to_string(),
        ));
        Ok(path.to_path_buf())
    }

    /// Read and decode a snapshot file without touching the live dataset
    pub fn read_document(&self, path: &Path) -> TrackbookResult<SnapshotDocument> {
        let bytes = fs::read(path).map_err(|e| {
            TrackbookError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.codec.decode(&bytes)
    }

    /// Replace the live dataset with the contents of a snapshot file
    pub fn import_file(&self, path: &Path) -> TrackbookResult<ImportOutcome> {
        let document = self.read_document(path)?;
        self.run_import(document, Action::Import, &path.display().to_string())
    }

    /// Replace the live dataset with serialized snapshot bytes
    pub fn import_bytes(&self, bytes: &[u8]) -> TrackbookResult<ImportOutcome> {
        let document = self.codec.decode(bytes)?;
        self.run_import(document, Action::Import, "in-memory document")
    }

    /// Replace the live dataset with an already decoded document
    pub fn import_document(&self, document: SnapshotDocument) -> TrackbookResult<ImportOutcome> {
        self.run_import(document, Action::Import, "in-memory document")
    }

    /// Replace the live dataset with a cloud backup's document
    pub fn restore_document(
        &self,
        document: SnapshotDocument,
        source: &str,
    ) -> TrackbookResult<ImportOutcome> {
        self.run_import(document, Action::CloudRestore, source)
    }

    /// Encode the live dataset and store it as a new cloud backup
    pub fn backup_to_cloud(&self, cloud: &CloudSnapshotStore) -> TrackbookResult<BackupRecord> {
        cloud.backup_dir()?;
        let document = self.export_document()?;
        let record = cloud.create(&document)?;

        self.activity.record_quietly(ActivityEntry::at(
            self.clock.now(),
            Action::CloudBackup,
            record.file_name.clone(),
        ));
        Ok(record)
    }

    /// Delete every entity in every collection
    pub fn wipe_all(&self) -> TrackbookResult<()> {
        let _exclusive = self.exclusive("wipe")?;
        self.codec.wipe(&self.storage)?;
        self.storage.save_all()?;

        warn!("wiped the live dataset");
        self.activity.record_quietly(ActivityEntry::at(
            self.clock.now(),
            Action::Wipe,
            "",
        ));
        Ok(())
    }

    fn run_import(
        &self,
        document: SnapshotDocument,
        action: Action,
        source: &str,
    ) -> TrackbookResult<ImportOutcome> {
        let _exclusive = self.exclusive("import")?;

        let current = self.codec.schema_version();
        let incoming = document.metadata.schema_version;
        if incoming > current {
            warn!(current, incoming, source, "refusing snapshot from a newer schema");
            return Err(TrackbookError::IncompatibleSchema { current, incoming });
        }

        let safety_document = self.codec.encode(&self.storage, self.clock.now())?;
        let safety_snapshot = self.safety.save(&safety_document)?;

        let loaded = match self.replace_dataset(&document) {
            Ok(loaded) => loaded,
            Err(original) => return Err(self.roll_back(&safety_snapshot, original, source)),
        };

        let pruned = match self.safety.delete_oldest_beyond(self.safety_keep) {
            Ok(pruned) => pruned,
            Err(e) => {
                warn!(error = %e, "failed to prune safety snapshots");
                Vec::new()
            }
        };

        let outcome = ImportOutcome {
            schema_version: incoming,
            safety_snapshot,
            loaded,
            pruned,
        };
        info!(
            source,
            entities = outcome.total_loaded(),
            schema_version = incoming,
            "replaced live dataset"
        );
        self.activity.record_quietly(ActivityEntry::at(
            self.clock.now(),
            action,
            format!("{} ({} entities)", source, outcome.total_loaded()),
        ));
        Ok(outcome)
    }

    fn replace_dataset(
        &self,
        document: &SnapshotDocument,
    ) -> TrackbookResult<Vec<(EntityKind, usize)>> {
        self.codec.wipe(&self.storage)?;
        let loaded = self.codec.load(&self.storage, document)?;
        self.storage.save_all()?;
        Ok(loaded)
    }

    /// Reload the safety snapshot after a failed replace; returns the error to
    /// hand back to the caller
    fn roll_back(
        &self,
        safety_snapshot: &Path,
        original: TrackbookError,
        source: &str,
    ) -> TrackbookError {
        warn!(error = %original, source, "import failed, restoring safety snapshot");

        let rollback = self
            .safety
            .load(safety_snapshot)
            .and_then(|document| self.replace_dataset(&document));

        match rollback {
            Ok(_) => {
                self.activity.record_quietly(ActivityEntry::at(
                    self.clock.now(),
                    Action::ImportRolledBack,
                    format!("{}: {}", source, original),
                ));
                original
            }
            Err(rollback) => {
                error!(
                    original = %original,
                    rollback = %rollback,
                    snapshot = %safety_snapshot.display(),
                    "rollback failed, live dataset may be inconsistent"
                );
                TrackbookError::RollbackFailed {
                    original: original.to_string(),
                    rollback: rollback.to_string(),
                }
            }
        }
    }

    fn shared(
        &self,
        operation: &str,
    ) -> TrackbookResult<(RwLockReadGuard<'_, ()>, DatasetGuard)> {
        let local = match self.gate.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(TrackbookError::Busy(format!(
                    "cannot {} while an import is in progress",
                    operation
                )))
            }
        };
        let on_disk = self.dataset_lock.try_shared(operation)?;
        Ok((local, on_disk))
    }

    fn exclusive(
        &self,
        operation: &str,
    ) -> TrackbookResult<(RwLockWriteGuard<'_, ()>, DatasetGuard)> {
        let local = match self.gate.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(TrackbookError::Busy(format!(
                    "cannot {} while another dataset operation is in progress",
                    operation
                )))
            }
        };
        let on_disk = self.dataset_lock.try_exclusive(operation)?;
        Ok((local, on_disk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cloud::{LockFileCoordinator, RetentionPolicy, SyncFolderAccount};
    use crate::models::{Checklist, Project, UserPreferences};
    use crate::snapshot::{EntityCollections, SnapshotMetadata, SCHEMA_VERSION};
    use crate::storage::{EntityRepository, JsonRepository};
    use crate::test_support::{seed_dataset_a, TestEnv};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    struct Fixture {
        _temp: TempDir,
        paths: crate::config::TrackbookPaths,
        clock: Arc<ManualClock>,
        coordinator: TransferCoordinator,
    }

    fn fixture_from(env: TestEnv) -> Fixture {
        let (temp, paths, storage) = env.into_shared();
        let clock = Arc::new(ManualClock::new(now()));
        let codec = DatasetCodec::new("laptop");
        let coordinator = TransferCoordinator::new(
            storage,
            codec.clone(),
            LocalSnapshotStore::new(paths.safety_backup_dir(), codec),
            paths.export_dir(),
            Arc::new(ActivityLog::new(paths.activity_log())),
            clock.clone(),
        );
        Fixture {
            _temp: temp,
            paths,
            clock,
            coordinator,
        }
    }

    fn fixture() -> Fixture {
        let env = TestEnv::new();
        seed_dataset_a(&env.storage);
        fixture_from(env)
    }

    /// A coordinator with its own storage on the same data directory, as a
    /// second process would have
    fn second_process(f: &Fixture) -> TransferCoordinator {
        let storage = Arc::new(Storage::new(f.paths.clone()).unwrap());
        let codec = DatasetCodec::new("desktop");
        TransferCoordinator::new(
            storage,
            codec.clone(),
            LocalSnapshotStore::new(f.paths.safety_backup_dir(), codec),
            f.paths.export_dir(),
            Arc::new(ActivityLog::new(f.paths.activity_log())),
            Arc::new(ManualClock::new(now())),
        )
    }

    /// "Dataset B": one project, no checklist items
    fn dataset_b(schema_version: u32) -> SnapshotDocument {
        SnapshotDocument {
            metadata: SnapshotMetadata {
                created_at: now() - Duration::days(2),
                app_version: "0.1.0".into(),
                device_name: "desktop".into(),
                schema_version,
            },
            user_preferences: UserPreferences {
                currency_code: "EUR".into(),
                ..UserPreferences::default()
            },
            entity_collections: EntityCollections {
                projects: Some(vec![Project::new("Attic")]),
                ..EntityCollections::default()
            },
        }
    }

    fn snapshot_of(f: &Fixture) -> SnapshotDocument {
        f.coordinator
            .codec()
            .encode(f.coordinator.storage(), now())
            .unwrap()
    }

    /// Checklist repository that rejects checklists with a marked title
    struct FailingChecklists {
        inner: JsonRepository<Checklist>,
        poison: &'static str,
    }

    impl EntityRepository<Checklist> for FailingChecklists {
        fn fetch_all(&self) -> TrackbookResult<Vec<Checklist>> {
            self.inner.fetch_all()
        }
        fn insert(&self, entity: Checklist) -> TrackbookResult<()> {
            if entity.title == self.poison {
                return Err(TrackbookError::Storage("constraint violation".into()));
            }
            self.inner.insert(entity)
        }
        fn delete_all(&self) -> TrackbookResult<()> {
            self.inner.delete_all()
        }
        fn persist(&self) -> TrackbookResult<()> {
            self.inner.persist()
        }
    }

    fn with_failing_checklists(env: &mut TestEnv, seed: Option<Checklist>) {
        let inner = JsonRepository::new(env.paths.collection_file(EntityKind::Checklists));
        if let Some(checklist) = seed {
            inner.insert(checklist).unwrap();
        }
        env.storage.checklists = Box::new(FailingChecklists {
            inner,
            poison: "explode",
        });
    }

    #[test]
    fn test_export_writes_timestamped_file() {
        let f = fixture();
        let path = f.coordinator.export().unwrap();

        assert_eq!(
            path,
            f.paths.export_dir().join("export_2026-10-19_08-30-00.json")
        );
        let document = f.coordinator.read_document(&path).unwrap();
        assert_eq!(document.entity_collections.projects.unwrap().len(), 2);
        assert_eq!(document.metadata.device_name, "laptop");
    }

    #[test]
    fn test_successful_import_replaces_dataset() {
        let f = fixture();
        let incoming = dataset_b(SCHEMA_VERSION);
        let expected_project = incoming.entity_collections.projects.clone().unwrap();

        let outcome = f.coordinator.import_document(incoming).unwrap();

        let storage = f.coordinator.storage();
        assert_eq!(storage.projects.fetch_all().unwrap(), expected_project);
        assert!(storage.checklists.fetch_all().unwrap().is_empty());
        assert!(storage.checklist_items.fetch_all().unwrap().is_empty());
        assert_eq!(storage.preferences.load().unwrap().currency_code, "EUR");
        assert_eq!(outcome.total_loaded(), 1);
        assert!(outcome.safety_snapshot.exists());

        let entries = ActivityLog::new(f.paths.activity_log()).read_all().unwrap();
        assert_eq!(entries.last().unwrap().action, Action::Import);
    }

    #[test]
    fn test_import_from_file_round_trip() {
        let source = fixture();
        let exported = source.coordinator.export().unwrap();
        let expected = snapshot_of(&source);

        let target = fixture_from(TestEnv::new());
        target.coordinator.import_file(&exported).unwrap();
        assert_eq!(
            snapshot_of(&target).entity_collections,
            expected.entity_collections
        );
    }

    #[test]
    fn test_older_schema_is_accepted() {
        let f = fixture();
        f.coordinator
            .import_document(dataset_b(SCHEMA_VERSION - 1))
            .unwrap();
        assert_eq!(f.coordinator.storage().projects.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn test_newer_schema_leaves_dataset_untouched() {
        let f = fixture();
        let before = snapshot_of(&f);

        let result = f.coordinator.import_document(dataset_b(SCHEMA_VERSION + 1));
        assert!(matches!(
            result,
            Err(TrackbookError::IncompatibleSchema { current, incoming })
                if current == SCHEMA_VERSION && incoming == SCHEMA_VERSION + 1
        ));

        assert_eq!(snapshot_of(&f), before);
        assert!(f.coordinator.safety.list().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_rejected_before_any_change() {
        let f = fixture();
        let before = snapshot_of(&f);
        let bogus = f.paths.base_dir().join("bogus.json");
        std::fs::write(&bogus, "{ not json").unwrap();

        let result = f.coordinator.import_file(&bogus);
        assert!(matches!(result, Err(TrackbookError::MalformedDocument(_))));
        assert_eq!(snapshot_of(&f), before);
    }

    #[test]
    fn test_failed_import_rolls_back() {
        let mut env = TestEnv::new();
        seed_dataset_a(&env.storage);
        let seeded = env.storage.checklists.fetch_all().unwrap();
        with_failing_checklists(&mut env, seeded.into_iter().next());
        let f = fixture_from(env);
        let before = snapshot_of(&f);

        // projects load, then the checklist insert fails
        let mut incoming = dataset_b(SCHEMA_VERSION);
        let project = incoming.entity_collections.projects.as_ref().unwrap()[0].clone();
        incoming.entity_collections.checklists = Some(vec![Checklist::new(project.id, "explode")]);

        let result = f.coordinator.import_document(incoming);
        assert!(matches!(result, Err(TrackbookError::Storage(_))));

        assert_eq!(snapshot_of(&f), before);
        let storage = f.coordinator.storage();
        assert_eq!(storage.projects.fetch_all().unwrap().len(), 2);
        assert_eq!(storage.checklist_items.fetch_all().unwrap().len(), 3);
        assert_eq!(storage.preferences.load().unwrap().currency_code, "USD");

        let entries = ActivityLog::new(f.paths.activity_log()).read_all().unwrap();
        assert_eq!(entries.last().unwrap().action, Action::ImportRolledBack);
    }

    #[test]
    fn test_rollback_failure_is_escalated() {
        let mut env = TestEnv::new();
        let project = Project::new("Shed");
        env.storage.projects.insert(project.clone()).unwrap();
        // the live dataset already holds a checklist the repository will refuse on reload
        with_failing_checklists(&mut env, Some(Checklist::new(project.id, "explode")));
        let f = fixture_from(env);

        let mut incoming = dataset_b(SCHEMA_VERSION);
        incoming.entity_collections.checklists = Some(vec![Checklist::new(project.id, "explode")]);

        let err = f.coordinator.import_document(incoming).unwrap_err();
        assert!(err.is_data_loss_risk());
        assert!(matches!(err, TrackbookError::RollbackFailed { .. }));
    }

    #[test]
    fn test_busy_rejection() {
        let f = fixture();

        {
            let _held = f.coordinator.gate.write().unwrap();
            assert!(matches!(
                f.coordinator.export(),
                Err(TrackbookError::Busy(_))
            ));
            assert!(matches!(
                f.coordinator.import_document(dataset_b(SCHEMA_VERSION)),
                Err(TrackbookError::Busy(_))
            ));
        }

        {
            let _reader = f.coordinator.gate.read().unwrap();
            assert!(matches!(
                f.coordinator.wipe_all(),
                Err(TrackbookError::Busy(_))
            ));
            // exports may overlap each other
            f.coordinator.export_document().unwrap();
        }

        assert_eq!(f.coordinator.storage().projects.fetch_all().unwrap().len(), 2);
    }

    #[test]
    fn test_second_process_is_rejected_while_import_runs() {
        let f = fixture();
        f.coordinator.storage().save_all().unwrap();
        let other = second_process(&f);

        {
            let _import = f.coordinator.exclusive("import").unwrap();
            assert!(matches!(
                other.import_document(dataset_b(SCHEMA_VERSION)),
                Err(TrackbookError::Busy(_))
            ));
            assert!(matches!(other.wipe_all(), Err(TrackbookError::Busy(_))));
            assert!(matches!(
                other.export_document(),
                Err(TrackbookError::Busy(_))
            ));
            assert!(matches!(
                other.reload_dataset(),
                Err(TrackbookError::Busy(_))
            ));
        }

        {
            let _export = f.coordinator.shared("export").unwrap();
            assert!(matches!(
                other.import_document(dataset_b(SCHEMA_VERSION)),
                Err(TrackbookError::Busy(_))
            ));
            other.export_document().unwrap();
        }

        // nothing was interleaved while the locks were held
        other.reload_dataset().unwrap();
        assert_eq!(other.storage().projects.fetch_all().unwrap().len(), 2);

        other.import_document(dataset_b(SCHEMA_VERSION)).unwrap();
        f.coordinator.reload_dataset().unwrap();
        assert_eq!(f.coordinator.storage().projects.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn test_safety_snapshots_are_pruned() {
        let f = fixture().coordinator_keep(3);

        for i in 0..5 {
            f.clock.advance(Duration::seconds(1));
            let outcome = f
                .coordinator
                .import_document(dataset_b(SCHEMA_VERSION))
                .unwrap();
            assert_eq!(outcome.pruned.len(), if i < 3 { 0 } else { 1 });
        }

        assert_eq!(f.coordinator.safety.list().unwrap().len(), 3);
    }

    #[test]
    fn test_wipe_all() {
        let f = fixture();
        f.coordinator.wipe_all().unwrap();
        assert_eq!(snapshot_of(&f).total_entities(), 0);
    }

    #[test]
    fn test_backup_to_cloud_and_restore() {
        let f = fixture();
        let before = snapshot_of(&f);
        let cloud_root = TempDir::new().unwrap();
        let cloud = CloudSnapshotStore::new(
            Box::new(SyncFolderAccount::new(Some(cloud_root.path().to_path_buf()))),
            Box::new(LockFileCoordinator::default()),
            DatasetCodec::new("laptop"),
            RetentionPolicy::default(),
            f.clock.clone(),
        );

        let record = f.coordinator.backup_to_cloud(&cloud).unwrap();
        assert_eq!(record.file_name, "backup_2026-10-19_08-30-00.json");

        f.coordinator.wipe_all().unwrap();
        f.clock.advance(Duration::minutes(5));
        cloud.restore(&record, &f.coordinator).unwrap();

        assert_eq!(
            snapshot_of(&f).entity_collections,
            before.entity_collections
        );
        let entries = ActivityLog::new(f.paths.activity_log()).read_all().unwrap();
        assert_eq!(entries.last().unwrap().action, Action::CloudRestore);
    }

    #[test]
    fn test_backup_to_unavailable_cloud() {
        let f = fixture();
        let cloud = CloudSnapshotStore::new(
            Box::new(SyncFolderAccount::new(None)),
            Box::new(LockFileCoordinator::default()),
            DatasetCodec::new("laptop"),
            RetentionPolicy::default(),
            f.clock.clone(),
        );

        let err = f.coordinator.backup_to_cloud(&cloud).unwrap_err();
        assert!(matches!(err, TrackbookError::CloudUnavailable(_)));
        assert!(err.is_retryable());
    }

    impl Fixture {
        fn coordinator_keep(mut self, keep: usize) -> Self {
            self.coordinator = self.coordinator.with_safety_keep(keep);
            self
        }
    }
}
