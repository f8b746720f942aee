use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trackbook::cli::{
    handle_backup_command, handle_export_command, handle_import_command,
    handle_maintenance_command, handle_wipe_command, BackupCommands, MaintenanceCommands,
    Services,
};
use trackbook::config::{paths::TrackbookPaths, settings::Settings};
use trackbook::snapshot::SCHEMA_VERSION;

#[derive(Parser)]
#[command(
    name = "trackbook",
    version,
    about = "Personal project tracker: snapshots, cloud backups and maintenance",
    long_about = "Trackbook keeps projects, checklists, expenses, ideas and notes. \
                  This tool exports and imports the whole dataset as a single JSON \
                  snapshot, keeps rotating backups in a synchronized cloud folder, \
                  and runs background maintenance."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,

    /// Export the whole dataset to a snapshot file
    Export {
        /// Output file (default: timestamped file in the export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the whole dataset with a snapshot file
    Import {
        /// Snapshot file to import
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete all data (developer use)
    Wipe {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Cloud backup commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Background maintenance commands
    #[command(subcommand, alias = "maint")]
    Maintenance(MaintenanceCommands),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trackbook=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = TrackbookPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing Trackbook at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            let services = Services::open(paths, settings)?;
            services.scheduler.register_tasks();
            println!("Initialization complete!");
            println!();
            println!("To keep cloud backups, set \"cloud.directory\" in config.json");
            println!("(or TRACKBOOK_CLOUD_DIR) to a synchronized folder, then run:");
            println!("  trackbook maintenance enable");
        }
        Some(Commands::Config) => {
            println!("Trackbook Configuration");
            println!("=======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Export directory: {}", paths.export_dir().display());
            println!("Safety snapshots: {}", paths.safety_backup_dir().display());
            println!("Activity log:     {}", paths.activity_log().display());
            println!();
            println!("Settings:");
            println!("  Device name:      {}", settings.resolved_device_name());
            println!(
                "  Cloud folder:     {}",
                settings
                    .cloud
                    .resolved_directory()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "(not configured)".into())
            );
            println!(
                "  Cloud retention:  {} backups, {} days",
                settings.cloud.max_count, settings.cloud.max_age_days
            );
            println!("  Safety snapshots: {}", settings.safety_keep_count);
            println!(
                "  Log retention:    {} days",
                settings.maintenance.activity_log_max_age_days
            );
            println!("  Schema version:   {}", SCHEMA_VERSION);
        }
        Some(Commands::Export { output }) => {
            let services = Services::open(paths, settings)?;
            handle_export_command(&services, output)?;
        }
        Some(Commands::Import { file, force }) => {
            let services = Services::open(paths, settings)?;
            handle_import_command(&services, &file, force)?;
        }
        Some(Commands::Wipe { force }) => {
            let services = Services::open(paths, settings)?;
            handle_wipe_command(&services, force)?;
        }
        Some(Commands::Backup(cmd)) => {
            let services = Services::open(paths, settings)?;
            handle_backup_command(&services, cmd)?;
        }
        Some(Commands::Maintenance(cmd)) => {
            let services = Services::open(paths, settings)?;
            handle_maintenance_command(&services, cmd)?;
        }
        None => {
            println!("Trackbook - personal project tracker");
            println!();
            println!("Run 'trackbook --help' for usage information.");
        }
    }

    Ok(())
}
