//! CLI commands for export, import and wipe

use std::path::{Path, PathBuf};

use super::{print_counts, Services};
use crate::error::{TrackbookError, TrackbookResult};
use crate::transfer::ImportOutcome;

/// Export the whole dataset to a snapshot file
pub fn handle_export_command(services: &Services, output: Option<PathBuf>) -> TrackbookResult<()> {
    let path = match output {
        Some(output) => services.transfer.export_to(&output)?,
        None => services.transfer.export()?,
    };

    let document = services.transfer.read_document(&path)?;
    println!("Exported to: {}", path.display());
    println!("{}", document.summary());
    Ok(())
}

/// Replace the dataset with a snapshot file
pub fn handle_import_command(services: &Services, file: &Path, force: bool) -> TrackbookResult<()> {
    let document = services.transfer.read_document(file)?;

    println!("Snapshot Information");
    println!("====================");
    println!("File: {}", file.display());
    println!(
        "Created: {}",
        document.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Device: {}", document.metadata.device_name);
    println!("App version: {}", document.metadata.app_version);
    println!("Schema version: {}", document.metadata.schema_version);
    println!("Contents: {}", document.summary());
    println!();

    if !force {
        println!("WARNING: This will replace ALL current data!");
        println!("To proceed, run again with --force flag:");
        println!("  trackbook import {} --force", file.display());
        return Ok(());
    }

    println!("Importing...");
    let outcome = report_data_loss(services.transfer.import_document(document))?;
    print_import_outcome(&outcome);
    Ok(())
}

/// Delete every entity in the dataset
pub fn handle_wipe_command(services: &Services, force: bool) -> TrackbookResult<()> {
    if !force {
        println!("WARNING: This deletes ALL projects, checklists, expenses, ideas and notes!");
        println!("Export first if you may want them back:");
        println!("  trackbook export");
        println!("To proceed, run again with --force flag:");
        println!("  trackbook wipe --force");
        return Ok(());
    }

    services.transfer.wipe_all()?;
    println!("All data has been deleted.");
    Ok(())
}

pub(crate) fn print_import_outcome(outcome: &ImportOutcome) {
    println!("Import complete! {} entities loaded.", outcome.total_loaded());
    print_counts(&outcome.loaded);
    println!();
    println!(
        "Previous data saved to: {}",
        outcome.safety_snapshot.display()
    );
    if !outcome.pruned.is_empty() {
        println!(
            "Removed {} older safety snapshot(s).",
            outcome.pruned.len()
        );
    }
}

/// Print the data-loss warning before passing a failed rollback on
pub(crate) fn report_data_loss<T>(result: TrackbookResult<T>) -> TrackbookResult<T> {
    if let Err(e @ TrackbookError::RollbackFailed { .. }) = &result {
        eprintln!("!!! The import failed and the previous data could not be restored.");
        eprintln!("!!! Your data may be incomplete. Do not delete any backups.");
        eprintln!("!!! {}", e);
    }
    result
}
