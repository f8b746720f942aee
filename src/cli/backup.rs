//! Backup CLI commands
//!
//! Implements CLI commands for managing backups in the cloud folder.

use clap::Subcommand;

use super::transfer::{print_import_outcome, report_data_loss};
use super::{format_duration, format_size, print_counts, Services};
use crate::activity::{Action, ActivityEntry};
use crate::cloud::BackupRecord;
use crate::error::{TrackbookError, TrackbookResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup in the cloud folder
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename (use 'latest' for most recent)
        backup: String,
    },

    /// Replace all current data with a backup
    Restore {
        /// Backup filename (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete one backup
    Delete {
        /// Backup filename
        backup: String,
    },

    /// Delete every backup in the cloud folder
    DeleteAll {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete backups outside the retention policy
    Prune,
}

/// Handle a backup command
pub fn handle_backup_command(services: &Services, cmd: BackupCommands) -> TrackbookResult<()> {
    let cloud = &services.cloud;

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let record = services.transfer.backup_to_cloud(cloud)?;
            println!("Backup created: {}", record.file_name);
            println!("Location: {}", record.path.display());
        }

        BackupCommands::List { verbose } => {
            let backups = cloud.list()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: trackbook backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(backup.created_at);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Device: {}\n   Size: {}\n   Age: {}\n   Schema: v{} (app {})\n",
                        i + 1,
                        backup.file_name,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        backup.device_name,
                        format_size(backup.size_bytes),
                        format_duration(age),
                        backup.schema_version,
                        backup.app_version,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {}, {})",
                        i + 1,
                        backup.file_name,
                        format_duration(age),
                        format_size(backup.size_bytes),
                        backup.device_name,
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Info { backup } => {
            let record = resolve_backup(services, &backup)?;
            let document = cloud.fetch(&record)?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", record.path.display());
            println!("Size: {}", format_size(record.size_bytes));
            println!(
                "Created: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Device: {}", record.device_name);
            println!("App version: {}", record.app_version);
            println!("Schema version: {}", record.schema_version);
            println!();
            println!("Contents:");
            print_counts(&document.counts());
        }

        BackupCommands::Restore { backup, force } => {
            let record = resolve_backup(services, &backup)?;
            let document = cloud.fetch(&record)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", record.file_name);
            println!(
                "Created: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Device: {}", record.device_name);
            println!("Contents: {}", document.summary());
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  trackbook backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            let outcome = report_data_loss(cloud.restore(&record, &services.transfer))?;
            print_import_outcome(&outcome);
        }

        BackupCommands::Delete { backup } => {
            let record = resolve_backup(services, &backup)?;
            cloud.delete(&record)?;
            record_deletion(services, &record);
            println!("Deleted backup: {}", record.file_name);
        }

        BackupCommands::DeleteAll { force } => {
            let backups = cloud.list()?;
            if backups.is_empty() {
                println!("No backups found.");
                return Ok(());
            }

            if !force {
                println!(
                    "WARNING: This will delete all {} backup(s) in {}",
                    backups.len(),
                    cloud.backup_dir()?.display()
                );
                println!("To proceed, run again with --force flag:");
                println!("  trackbook backup delete-all --force");
                return Ok(());
            }

            let report = cloud.delete_all()?;
            for record in &report.deleted {
                record_deletion(services, record);
            }
            println!("Deleted {} backup(s).", report.deleted.len());
            for (record, e) in &report.failed {
                println!("  Could not delete {}: {}", record.file_name, e);
            }
        }

        BackupCommands::Prune => {
            let retention = cloud.retention();
            let deleted = cloud.enforce_retention()?;
            for record in &deleted {
                record_deletion(services, record);
            }

            println!(
                "Retention policy: keep {} backup(s), none older than {} day(s)",
                retention.max_count,
                retention.max_age.num_days()
            );
            if deleted.is_empty() {
                println!("No backups to prune.");
            } else {
                println!("Deleted {} backup(s).", deleted.len());
            }
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a listed record
fn resolve_backup(services: &Services, backup: &str) -> TrackbookResult<BackupRecord> {
    if backup.eq_ignore_ascii_case("latest") {
        return services
            .cloud
            .latest()?
            .ok_or_else(|| TrackbookError::backup_not_found("latest"));
    }

    match services.cloud.find(backup) {
        Err(e) if e.is_not_found() && !backup.ends_with(".json") => {
            services.cloud.find(&format!("{}.json", backup))
        }
        other => other,
    }
}

fn record_deletion(services: &Services, record: &BackupRecord) {
    services.activity.record_quietly(ActivityEntry::new(
        Action::CloudDelete,
        record.file_name.clone(),
    ));
}
