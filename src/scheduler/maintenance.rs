//! Maintenance scheduler
//!
//! Runs the daily cloud backup and the activity-log cleanup through a
//! [`TaskPort`]. Each run reschedules itself whatever its outcome, and
//! `run_due` queues a run for any wanted task that has none, so one failed,
//! missed or crashed run never ends the recurrence.
//!
//! One [`TaskContext`] covers a whole `run_due` invocation. A body checks it
//! before starting and again after its work; an overrun counts as expiry.
//!
//! Nothing here returns an error to the caller. Failures become the
//! persisted pending-retry flag plus a log event, and are picked up again by
//! the foreground catch-up calls.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use super::queue::TaskPort;
use super::state::SchedulerState;
use super::task::{TaskContext, TaskKind, TaskOutcome, TaskPhase, TaskRequest};
use crate::activity::{Action, ActivityEntry, ActivityLog};
use crate::clock::Clock;
use crate::cloud::CloudSnapshotStore;
use crate::error::TrackbookResult;
use crate::transfer::TransferCoordinator;

/// What the settings screen shows about background maintenance
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub auto_backup_enabled: bool,
    pub last_backup_attempt: Option<DateTime<Utc>>,
    pub last_backup_success: Option<DateTime<Utc>>,
    pub backup_pending_retry: bool,
    pub cleanup_pending_retry: bool,
    pub last_cleanup_date: Option<NaiveDate>,
    pub phases: Vec<(TaskKind, TaskPhase)>,
    pub queued: Vec<TaskRequest>,
}

impl SchedulerStatus {
    /// The last backup attempt did not complete
    pub fn backup_interrupted(&self) -> bool {
        match (self.last_backup_attempt, self.last_backup_success) {
            (Some(attempt), Some(success)) => attempt > success,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

pub struct MaintenanceScheduler {
    state: SchedulerState,
    port: Arc<dyn TaskPort>,
    transfer: Arc<TransferCoordinator>,
    cloud: Arc<CloudSnapshotStore>,
    activity: Arc<ActivityLog>,
    clock: Arc<dyn Clock>,
    log_max_age: Duration,
    task_budget: Duration,
}

impl MaintenanceScheduler {
    pub fn new(
        state: SchedulerState,
        port: Arc<dyn TaskPort>,
        transfer: Arc<TransferCoordinator>,
        cloud: Arc<CloudSnapshotStore>,
        activity: Arc<ActivityLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state,
            port,
            transfer,
            cloud,
            activity,
            clock,
            log_max_age: Duration::days(30),
            task_budget: Duration::minutes(2),
        }
    }

    /// Activity entries older than this are removed by the cleanup task
    pub fn with_log_max_age(mut self, max_age: Duration) -> Self {
        self.log_max_age = max_age;
        self
    }

    /// Time granted to one task run
    pub fn with_task_budget(mut self, budget: Duration) -> Self {
        self.task_budget = budget;
        self
    }

    /// Register both tasks and queue a first run for each wanted task that
    /// has nothing queued yet
    pub fn register_tasks(&self) {
        for task in TaskKind::ALL {
            if let Err(e) = self.port.register(task) {
                warn!(task = %task, error = %e, "task registration failed");
                self.mark_pending(task);
            }
        }
        self.requeue_missing();
    }

    /// Queue the next run of every wanted task that has none queued
    fn requeue_missing(&self) {
        let queued = match self.port.pending() {
            Ok(queued) => queued,
            Err(e) => {
                warn!(error = %e, "could not read task queue");
                return;
            }
        };

        for task in TaskKind::ALL {
            if self.wants(task) && !queued.iter().any(|r| r.task == task) {
                debug!(task = %task, "nothing queued, scheduling next run");
                self.schedule_next(task);
            }
        }
    }

    /// Submit the next run of `task`; on refusal the work is flagged for retry
    pub fn schedule_next(&self, task: TaskKind) -> Option<DateTime<Utc>> {
        let not_before = task.next_fire_time(self.clock.now());
        match self.port.submit(TaskRequest::new(task, not_before)) {
            Ok(()) => {
                self.persist("task phase", self.state.set_phase(task, TaskPhase::Scheduled));
                debug!(task = %task, %not_before, "scheduled next run");
                Some(not_before)
            }
            Err(e) => {
                warn!(task = %task, error = %e, "could not submit next run");
                self.mark_pending(task);
                None
            }
        }
    }

    /// Turn the daily backup on or off
    pub fn set_auto_backup(&self, enabled: bool) -> Option<DateTime<Utc>> {
        self.persist(
            "auto backup flag",
            self.state.set_auto_backup_enabled(enabled),
        );

        if enabled {
            return self.schedule_next(TaskKind::DailyBackup);
        }

        if let Err(e) = self.port.cancel(TaskKind::DailyBackup) {
            warn!(error = %e, "could not cancel queued backup");
        }
        self.persist(
            "task phase",
            self.state
                .set_phase(TaskKind::DailyBackup, TaskPhase::Unscheduled),
        );
        None
    }

    /// A fresh budget starting now
    pub fn new_context(&self) -> TaskContext {
        TaskContext::new(self.clock.now() + self.task_budget)
    }

    /// Run every queued task whose time has come, within one budget
    pub fn run_due(&self) -> Vec<(TaskKind, TaskOutcome)> {
        self.requeue_missing();

        let due = match self.port.due(self.clock.now()) {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "could not read due tasks");
                return Vec::new();
            }
        };

        let ctx = self.new_context();
        due.into_iter()
            .map(|request| (request.task, self.run_task(request.task, &ctx)))
            .collect()
    }

    /// Task body as the deferred-execution facility invokes it
    pub fn run_task(&self, task: TaskKind, ctx: &TaskContext) -> TaskOutcome {
        self.persist("task phase", self.state.set_phase(task, TaskPhase::Running));

        let outcome = match task {
            TaskKind::DailyBackup => self.run_backup(ctx),
            TaskKind::LogCleanup => self.run_cleanup(ctx),
        };

        let phase = if outcome.is_success() {
            TaskPhase::Succeeded
        } else {
            TaskPhase::Failed
        };
        self.persist("task phase", self.state.set_phase(task, phase));
        info!(task = %task, outcome = %outcome, "maintenance task finished");

        if self.wants(task) {
            self.schedule_next(task);
        } else if let Err(e) = self.port.cancel(task) {
            warn!(task = %task, error = %e, "could not drop queued run");
        }
        outcome
    }

    /// Run the backup now if the last one failed, was interrupted, or could
    /// not be scheduled
    pub fn retry_backup_if_pending(&self) -> Option<TaskOutcome> {
        if !self.wants(TaskKind::DailyBackup) {
            return None;
        }

        let pending = self.read(
            "pending retry",
            self.state.pending_retry(TaskKind::DailyBackup),
        ) || self.read("backup attempt", self.state.backup_interrupted());
        if !pending {
            return None;
        }

        info!("retrying missed backup in the foreground");
        Some(self.run_task(TaskKind::DailyBackup, &self.new_context()))
    }

    /// Run the cleanup now unless it already ran today
    pub fn run_foreground_cleanup_if_needed(&self) -> TaskOutcome {
        self.run_task(TaskKind::LogCleanup, &self.new_context())
    }

    /// Everything a foreground launch should catch up on
    pub fn catch_up(&self) -> Vec<(TaskKind, TaskOutcome)> {
        let mut ran = Vec::new();
        if let Some(outcome) = self.retry_backup_if_pending() {
            ran.push((TaskKind::DailyBackup, outcome));
        }
        ran.push((TaskKind::LogCleanup, self.run_foreground_cleanup_if_needed()));
        ran
    }

    pub fn status(&self) -> TrackbookResult<SchedulerStatus> {
        let mut phases = Vec::with_capacity(TaskKind::ALL.len());
        for task in TaskKind::ALL {
            phases.push((task, self.state.phase(task)?));
        }

        Ok(SchedulerStatus {
            auto_backup_enabled: self.state.auto_backup_enabled()?,
            last_backup_attempt: self.state.last_backup_attempt()?,
            last_backup_success: self.state.last_backup_success()?,
            backup_pending_retry: self.state.pending_retry(TaskKind::DailyBackup)?,
            cleanup_pending_retry: self.state.pending_retry(TaskKind::LogCleanup)?,
            last_cleanup_date: self.state.last_cleanup_date()?,
            phases,
            queued: self.port.pending()?,
        })
    }

    fn run_backup(&self, ctx: &TaskContext) -> TaskOutcome {
        if !self.wants(TaskKind::DailyBackup) {
            debug!("automatic backup is disabled");
            return TaskOutcome::Skipped;
        }

        let started = self.clock.now();
        self.persist(
            "last backup attempt",
            self.state.set_last_backup_attempt(started),
        );

        if ctx.is_expired_at(started) {
            self.mark_pending(TaskKind::DailyBackup);
            return TaskOutcome::Expired;
        }

        match self.transfer.backup_to_cloud(&self.cloud) {
            Ok(record) if ctx.is_expired_at(self.clock.now()) => {
                warn!(file = %record.file_name, "backup finished after its budget ran out");
                self.mark_pending(TaskKind::DailyBackup);
                TaskOutcome::Expired
            }
            Ok(record) => {
                self.persist(
                    "last backup success",
                    self.state.set_last_backup_success(self.clock.now()),
                );
                self.persist(
                    "pending retry",
                    self.state.set_pending_retry(TaskKind::DailyBackup, false),
                );
                info!(file = %record.file_name, "automatic backup complete");
                TaskOutcome::Succeeded
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "automatic backup failed");
                self.mark_pending(TaskKind::DailyBackup);
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    fn run_cleanup(&self, ctx: &TaskContext) -> TaskOutcome {
        let now = self.clock.now();
        let today = now.date_naive();

        if self.read("last cleanup date", self.state.last_cleanup_date()) == Some(today) {
            debug!(%today, "activity log already cleaned today");
            return TaskOutcome::Skipped;
        }

        if ctx.is_expired_at(now) {
            self.mark_pending(TaskKind::LogCleanup);
            return TaskOutcome::Expired;
        }

        match self.activity.prune_older_than(now - self.log_max_age) {
            Ok(removed) if ctx.is_expired_at(self.clock.now()) => {
                warn!(removed, "log cleanup finished after its budget ran out");
                self.mark_pending(TaskKind::LogCleanup);
                TaskOutcome::Expired
            }
            Ok(removed) => {
                self.persist(
                    "last cleanup date",
                    self.state.set_last_cleanup_date(today),
                );
                self.persist(
                    "pending retry",
                    self.state.set_pending_retry(TaskKind::LogCleanup, false),
                );
                if removed > 0 {
                    self.activity.record_quietly(ActivityEntry::at(
                        now,
                        Action::LogCleanup,
                        format!("removed {} entries", removed),
                    ));
                }
                TaskOutcome::Succeeded
            }
            Err(e) => {
                warn!(error = %e, "activity log cleanup failed");
                self.mark_pending(TaskKind::LogCleanup);
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    fn wants(&self, task: TaskKind) -> bool {
        match task {
            TaskKind::LogCleanup => true,
            TaskKind::DailyBackup => {
                self.read("auto backup flag", self.state.auto_backup_enabled())
            }
        }
    }

    fn mark_pending(&self, task: TaskKind) {
        self.persist("pending retry", self.state.set_pending_retry(task, true));
    }

    fn persist(&self, what: &str, result: TrackbookResult<()>) {
        if let Err(e) = result {
            error!(what, error = %e, "failed to persist scheduler state");
        }
    }

    fn read<T: Default>(&self, what: &str, result: TrackbookResult<T>) -> T {
        result.unwrap_or_else(|e| {
            warn!(what, error = %e, "failed to read scheduler state");
            T::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cloud::{FileCoordinator, LockFileCoordinator, RetentionPolicy, SyncFolderAccount};
    use crate::scheduler::{JsonStateStore, ManualTaskQueue, MemoryStateStore, StateStore};
    use crate::snapshot::{DatasetCodec, LocalSnapshotStore};
    use crate::test_support::{seed_dataset_a, TestEnv};
    use chrono::TimeZone;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap()
    }

    fn midnight_after(now: DateTime<Utc>) -> DateTime<Utc> {
        TaskKind::DailyBackup.next_fire_time(now)
    }

    struct Harness {
        _temp: TempDir,
        _cloud_root: TempDir,
        clock: Arc<ManualClock>,
        queue: Arc<ManualTaskQueue>,
        cloud: Arc<CloudSnapshotStore>,
        activity: Arc<ActivityLog>,
        transfer: Arc<TransferCoordinator>,
        state_file: PathBuf,
    }

    /// Cloud writes that take `delay` of clock time
    struct SlowUpload {
        inner: LockFileCoordinator,
        clock: Arc<ManualClock>,
        delay: Duration,
    }

    impl FileCoordinator for SlowUpload {
        fn read(&self, path: &Path) -> TrackbookResult<Vec<u8>> {
            self.inner.read(path)
        }
        fn write(&self, path: &Path, bytes: &[u8]) -> TrackbookResult<()> {
            self.clock.advance(self.delay);
            self.inner.write(path, bytes)
        }
        fn delete(&self, path: &Path) -> TrackbookResult<()> {
            self.inner.delete(path)
        }
        fn list(&self, dir: &Path) -> TrackbookResult<Vec<PathBuf>> {
            self.inner.list(dir)
        }
    }

    impl Harness {
        fn new(cloud_signed_in: bool) -> Self {
            Self::with_coordinator(cloud_signed_in, |_| Box::new(LockFileCoordinator::default()))
        }

        fn with_coordinator(
            cloud_signed_in: bool,
            coordinator: impl FnOnce(Arc<ManualClock>) -> Box<dyn FileCoordinator>,
        ) -> Self {
            let env = TestEnv::new();
            seed_dataset_a(&env.storage);
            let (temp, paths, storage) = env.into_shared();
            let cloud_root = TempDir::new().unwrap();
            let clock = Arc::new(ManualClock::new(start()));
            let codec = DatasetCodec::new("laptop");
            let activity = Arc::new(ActivityLog::new(paths.activity_log()));

            let transfer = Arc::new(TransferCoordinator::new(
                storage,
                codec.clone(),
                LocalSnapshotStore::new(paths.safety_backup_dir(), codec.clone()),
                paths.export_dir(),
                activity.clone(),
                clock.clone(),
            ));
            let root = cloud_signed_in.then(|| cloud_root.path().to_path_buf());
            let cloud = Arc::new(CloudSnapshotStore::new(
                Box::new(SyncFolderAccount::new(root)),
                coordinator(clock.clone()),
                codec,
                RetentionPolicy::default(),
                clock.clone(),
            ));

            Self {
                state_file: paths.scheduler_state_file(),
                _temp: temp,
                _cloud_root: cloud_root,
                clock,
                queue: Arc::new(ManualTaskQueue::new()),
                cloud,
                activity,
                transfer,
            }
        }

        fn scheduler_with(&self, store: Box<dyn StateStore>) -> MaintenanceScheduler {
            MaintenanceScheduler::new(
                SchedulerState::new(store),
                self.queue.clone(),
                self.transfer.clone(),
                self.cloud.clone(),
                self.activity.clone(),
                self.clock.clone(),
            )
        }

        fn scheduler(&self) -> MaintenanceScheduler {
            self.scheduler_with(Box::new(JsonStateStore::new(self.state_file.clone())))
        }
    }

    #[test]
    fn test_register_schedules_only_wanted_tasks() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();

        assert_eq!(
            h.queue.pending().unwrap(),
            vec![TaskRequest::new(TaskKind::LogCleanup, midnight_after(start()))]
        );

        scheduler.set_auto_backup(true);
        let status = scheduler.status().unwrap();
        assert!(status.auto_backup_enabled);
        assert_eq!(status.queued.len(), 2);
        assert!(status
            .phases
            .iter()
            .all(|(_, phase)| *phase == TaskPhase::Scheduled));
    }

    #[test]
    fn test_register_keeps_existing_requests() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();

        h.clock.set(midnight_after(start()) + Duration::minutes(5));
        scheduler.register_tasks();

        // the due request was not pushed back a day
        assert_eq!(h.queue.due(h.clock.now()).unwrap().len(), 1);
    }

    #[test]
    fn test_successful_backup_run() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);

        let outcome = scheduler.run_task(TaskKind::DailyBackup, &scheduler.new_context());
        assert_eq!(outcome, TaskOutcome::Succeeded);

        let status = scheduler.status().unwrap();
        assert_eq!(status.last_backup_success, Some(start()));
        assert!(!status.backup_pending_retry);
        assert!(!status.backup_interrupted());
        assert_eq!(h.cloud.list().unwrap().len(), 1);
        assert!(status
            .queued
            .contains(&TaskRequest::new(TaskKind::DailyBackup, midnight_after(start()))));
    }

    #[test]
    fn test_failed_backup_sets_pending_retry_and_reschedules() {
        let h = Harness::new(false);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);
        h.queue.cancel(TaskKind::DailyBackup).unwrap();

        let outcome = scheduler.run_task(TaskKind::DailyBackup, &scheduler.new_context());
        assert!(matches!(outcome, TaskOutcome::Failed(_)));

        let status = scheduler.status().unwrap();
        assert!(status.backup_pending_retry);
        assert_eq!(status.last_backup_attempt, Some(start()));
        assert_eq!(status.last_backup_success, None);
        assert!(status.queued.iter().any(|r| r.task == TaskKind::DailyBackup));
        assert!(status
            .phases
            .contains(&(TaskKind::DailyBackup, TaskPhase::Scheduled)));
    }

    #[test]
    fn test_submission_failure_sets_pending_retry() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        h.queue.set_reject_submissions(true);

        assert_eq!(scheduler.set_auto_backup(true), None);
        assert!(scheduler.status().unwrap().backup_pending_retry);

        // next foreground launch picks the work up
        h.queue.set_reject_submissions(false);
        assert_eq!(
            scheduler.retry_backup_if_pending(),
            Some(TaskOutcome::Succeeded)
        );
        let status = scheduler.status().unwrap();
        assert!(!status.backup_pending_retry);
        assert!(status.queued.iter().any(|r| r.task == TaskKind::DailyBackup));
    }

    #[test]
    fn test_crash_mid_run_is_retried_on_next_launch() {
        let h = Harness::new(true);
        {
            let scheduler = h.scheduler();
            scheduler.register_tasks();
            scheduler.set_auto_backup(true);
            // the process died after recording the attempt
            scheduler
                .state
                .set_last_backup_attempt(h.clock.now())
                .unwrap();
            scheduler
                .state
                .set_phase(TaskKind::DailyBackup, TaskPhase::Running)
                .unwrap();
        }

        h.clock.advance(Duration::hours(3));
        let relaunched = h.scheduler();
        let status = relaunched.status().unwrap();
        assert!(status.backup_interrupted());
        assert!(!status.backup_pending_retry);

        assert_eq!(
            relaunched.retry_backup_if_pending(),
            Some(TaskOutcome::Succeeded)
        );
        assert!(!relaunched.status().unwrap().backup_interrupted());
        assert_eq!(relaunched.retry_backup_if_pending(), None);
    }

    #[test]
    fn test_expired_run_assumes_failure() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);

        let ctx = scheduler.new_context();
        ctx.expire();
        assert_eq!(
            scheduler.run_task(TaskKind::DailyBackup, &ctx),
            TaskOutcome::Expired
        );

        let status = scheduler.status().unwrap();
        assert!(status.backup_pending_retry);
        assert!(h.cloud.list().unwrap().is_empty());
        assert!(status.queued.iter().any(|r| r.task == TaskKind::DailyBackup));
    }

    #[test]
    fn test_budget_exhaustion_counts_as_expiry() {
        let h = Harness::new(true);
        let scheduler = h.scheduler().with_task_budget(Duration::seconds(30));
        scheduler.register_tasks();

        let ctx = scheduler.new_context();
        h.clock.advance(Duration::minutes(1));
        assert_eq!(
            scheduler.run_task(TaskKind::LogCleanup, &ctx),
            TaskOutcome::Expired
        );
        assert!(scheduler.status().unwrap().cleanup_pending_retry);
    }

    #[test]
    fn test_budget_running_out_mid_run_counts_as_expiry() {
        let h = Harness::with_coordinator(true, |clock| {
            Box::new(SlowUpload {
                inner: LockFileCoordinator::default(),
                clock,
                delay: Duration::minutes(5),
            })
        });
        let scheduler = h.scheduler().with_task_budget(Duration::minutes(2));
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);
        h.clock.set(midnight_after(start()) + Duration::minutes(1));

        let ran = scheduler.run_due();
        assert_eq!(
            ran,
            vec![
                (TaskKind::DailyBackup, TaskOutcome::Expired),
                // same budget, already spent by the slow upload
                (TaskKind::LogCleanup, TaskOutcome::Expired),
            ]
        );

        // the file landed, but the run is not trusted
        assert_eq!(h.cloud.list().unwrap().len(), 1);
        let status = scheduler.status().unwrap();
        assert!(status.backup_pending_retry);
        assert!(status.cleanup_pending_retry);
        assert_eq!(status.last_backup_success, None);
        assert_eq!(status.queued.len(), 2);
        assert!(status.queued.iter().all(|r| r.not_before > h.clock.now()));
    }

    #[test]
    fn test_run_interrupted_by_crash_fires_again() {
        let h = Harness::new(true);
        {
            let scheduler = h.scheduler();
            scheduler.register_tasks();
            scheduler.set_auto_backup(true);
        }
        let first = midnight_after(start());
        h.clock.set(first + Duration::minutes(1));
        {
            // run-due started the backup body and the process died
            let scheduler = h.scheduler();
            scheduler
                .state
                .set_phase(TaskKind::DailyBackup, TaskPhase::Running)
                .unwrap();
            scheduler
                .state
                .set_last_backup_attempt(h.clock.now())
                .unwrap();
        }

        h.clock.advance(Duration::minutes(15));
        let ran = h.scheduler().run_due();
        let tasks: Vec<_> = ran.iter().map(|(task, _)| *task).collect();
        assert_eq!(tasks, vec![TaskKind::DailyBackup, TaskKind::LogCleanup]);
        assert!(ran.iter().all(|(_, outcome)| outcome.is_success()));
        assert!(h
            .queue
            .pending()
            .unwrap()
            .iter()
            .all(|r| r.not_before == first + Duration::days(1)));
    }

    #[test]
    fn test_run_due_requeues_lost_requests() {
        let h = Harness::new(true);
        {
            let scheduler = h.scheduler();
            scheduler.register_tasks();
            scheduler.set_auto_backup(true);
        }
        // the queue lost both requests
        h.queue.cancel(TaskKind::DailyBackup).unwrap();
        h.queue.cancel(TaskKind::LogCleanup).unwrap();
        h.clock.set(midnight_after(start()) + Duration::minutes(1));

        assert!(h.scheduler().run_due().is_empty());
        assert_eq!(h.queue.pending().unwrap().len(), 2);

        for _ in 0..3 {
            h.clock.advance(Duration::days(1));
            let ran = h.scheduler().run_due();
            assert_eq!(ran.len(), 2);
            assert!(ran.iter().all(|(_, outcome)| outcome.is_success()));
            assert_eq!(h.queue.pending().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_cleanup_runs_once_per_day() {
        let h = Harness::new(true);
        for days_ago in [40, 35, 2] {
            h.activity
                .record(&ActivityEntry::at(
                    start() - Duration::days(days_ago),
                    Action::Export,
                    format!("{} days ago", days_ago),
                ))
                .unwrap();
        }
        let scheduler = h.scheduler();

        assert_eq!(
            scheduler.run_foreground_cleanup_if_needed(),
            TaskOutcome::Succeeded
        );
        let after_first = h.activity.read_all().unwrap();
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[1].action, Action::LogCleanup);

        // older entry appears, but the body must not run again today
        h.activity
            .record(&ActivityEntry::at(
                start() - Duration::days(50),
                Action::Export,
                "late arrival",
            ))
            .unwrap();
        h.clock.advance(Duration::hours(6));
        assert_eq!(
            scheduler.run_foreground_cleanup_if_needed(),
            TaskOutcome::Skipped
        );
        assert_eq!(h.activity.read_all().unwrap().len(), 3);

        h.clock.advance(Duration::days(1));
        assert_eq!(
            scheduler.run_foreground_cleanup_if_needed(),
            TaskOutcome::Succeeded
        );
    }

    #[test]
    fn test_disabled_backup_is_skipped_and_not_rescheduled() {
        let h = Harness::new(true);
        let scheduler = h.scheduler_with(Box::new(MemoryStateStore::new()));
        scheduler.register_tasks();

        assert_eq!(
            scheduler.run_task(TaskKind::DailyBackup, &scheduler.new_context()),
            TaskOutcome::Skipped
        );
        assert!(h
            .queue
            .pending()
            .unwrap()
            .iter()
            .all(|r| r.task != TaskKind::DailyBackup));
        assert_eq!(scheduler.retry_backup_if_pending(), None);
    }

    #[test]
    fn test_run_due_fires_queued_tasks() {
        let h = Harness::new(true);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);

        assert!(scheduler.run_due().is_empty());

        let next = midnight_after(start());
        h.clock.set(next + Duration::minutes(1));
        let ran = scheduler.run_due();
        let tasks: Vec<_> = ran.iter().map(|(task, _)| *task).collect();
        assert_eq!(tasks, vec![TaskKind::DailyBackup, TaskKind::LogCleanup]);
        assert!(ran.iter().all(|(_, outcome)| outcome.is_success()));

        // both rescheduled for the following midnight
        let queued = h.queue.pending().unwrap();
        assert_eq!(queued.len(), 2);
        assert!(queued
            .iter()
            .all(|r| r.not_before == next + Duration::days(1)));
    }

    #[test]
    fn test_catch_up() {
        let h = Harness::new(false);
        let scheduler = h.scheduler();
        scheduler.register_tasks();
        scheduler.set_auto_backup(true);
        scheduler.run_task(TaskKind::DailyBackup, &scheduler.new_context());

        let ran = scheduler.catch_up();
        assert_eq!(ran.len(), 2);
        assert!(matches!(ran[0], (TaskKind::DailyBackup, TaskOutcome::Failed(_))));
        assert_eq!(ran[1], (TaskKind::LogCleanup, TaskOutcome::Succeeded));
    }
}
