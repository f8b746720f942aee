//! Background maintenance CLI commands
//!
//! `run-due` is what an external timer invokes; `catch-up` is the
//! foreground path for runs that the timer missed.

use clap::Subcommand;

use super::Services;
use crate::error::TrackbookResult;
use crate::scheduler::{TaskKind, TaskOutcome};

/// Maintenance subcommands
#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Show scheduler state and recent activity
    Status {
        /// Number of activity entries to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Register the maintenance tasks and queue their first runs
    Register,

    /// Run every queued task whose time has come
    RunDue,

    /// Retry a pending backup and run today's cleanup if it has not run
    CatchUp,

    /// Enable the daily cloud backup
    Enable,

    /// Disable the daily cloud backup
    Disable,
}

/// Handle a maintenance command
pub fn handle_maintenance_command(
    services: &Services,
    cmd: MaintenanceCommands,
) -> TrackbookResult<()> {
    let scheduler = &services.scheduler;

    match cmd {
        MaintenanceCommands::Status { limit } => {
            let status = scheduler.status()?;

            println!("Maintenance Status");
            println!("==================");
            println!(
                "Automatic backup: {}",
                if status.auto_backup_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Last attempt:     {}", format_time(status.last_backup_attempt));
            println!("Last success:     {}", format_time(status.last_backup_success));
            if status.backup_interrupted() || status.backup_pending_retry {
                println!("                  (retry pending)");
            }
            println!(
                "Last cleanup:     {}",
                status
                    .last_cleanup_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "never".into())
            );
            if status.cleanup_pending_retry {
                println!("                  (retry pending)");
            }
            println!();

            println!("Tasks:");
            for (task, phase) in &status.phases {
                let next = status
                    .queued
                    .iter()
                    .find(|r| r.task == *task)
                    .map(|r| r.not_before.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "-".into());
                println!("  {:<22} {:<12} next: {}", task.as_str(), phase.as_str(), next);
            }

            let recent = services.activity.read_recent(limit)?;
            if !recent.is_empty() {
                println!();
                println!("Recent activity:");
                for entry in recent.iter().rev() {
                    println!("  {}", entry.format_human_readable());
                }
            }
        }

        MaintenanceCommands::Register => {
            scheduler.register_tasks();
            println!("Maintenance tasks registered.");
            for request in scheduler.status()?.queued {
                println!(
                    "  {} at {}",
                    request.task,
                    request.not_before.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }

        MaintenanceCommands::RunDue => {
            let ran = scheduler.run_due();
            if ran.is_empty() {
                println!("No tasks due.");
            }
            print_outcomes(&ran);
        }

        MaintenanceCommands::CatchUp => {
            print_outcomes(&scheduler.catch_up());
        }

        MaintenanceCommands::Enable => match scheduler.set_auto_backup(true) {
            Some(next) => println!(
                "Automatic backup enabled. Next run: {}",
                next.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!(
                "Automatic backup enabled, but the next run could not be queued. \
                 It will be retried by 'trackbook maintenance catch-up'."
            ),
        },

        MaintenanceCommands::Disable => {
            scheduler.set_auto_backup(false);
            println!("Automatic backup disabled.");
        }
    }

    Ok(())
}

fn print_outcomes(ran: &[(TaskKind, TaskOutcome)]) {
    for (task, outcome) in ran {
        println!("  {}: {}", task, outcome);
    }
}

fn format_time(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".into())
}
