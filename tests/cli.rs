//! CLI integration tests for trackbook
//!
//! Runs the binary end-to-end against temporary data and cloud folders.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command rooted at a private data directory with no cloud folder
#[allow(deprecated)]
fn trackbook_cmd(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trackbook").unwrap();
    cmd.env("TRACKBOOK_DATA_DIR", data.path());
    cmd.env_remove("TRACKBOOK_CLOUD_DIR");
    cmd.env("RUST_LOG", "off");
    cmd
}

fn trackbook_with_cloud(data: &TempDir, cloud: &TempDir) -> Command {
    let mut cmd = trackbook_cmd(data);
    cmd.env("TRACKBOOK_CLOUD_DIR", cloud.path());
    cmd
}

#[test]
fn test_init_creates_layout() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));

    assert!(data.path().join("config.json").exists());
    assert!(data.path().join("data").is_dir());
}

#[test]
fn test_config_reports_cloud_not_configured() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("(not configured)"))
        .stdout(predicate::str::contains("5 backups, 30 days"));
}

#[test]
fn test_export_writes_snapshot_file() {
    let data = TempDir::new().unwrap();
    let out = data.path().join("out.json");

    trackbook_cmd(&data)
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported to:"));

    let text = std::fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["metadata"]["schemaVersion"], 2);
    assert!(json["entityCollections"].is_object());
}

#[test]
fn test_import_without_force_only_previews() {
    let data = TempDir::new().unwrap();
    let out = data.path().join("snapshot.json");

    trackbook_cmd(&data)
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success();

    trackbook_cmd(&data)
        .arg("import")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("--force"));

    let safety_dir = data.path().join("safety_backups");
    let taken = std::fs::read_dir(&safety_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(taken, 0, "preview must not take a safety snapshot");
}

#[test]
fn test_import_with_force_takes_safety_snapshot() {
    let data = TempDir::new().unwrap();
    let out = data.path().join("snapshot.json");

    trackbook_cmd(&data)
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success();

    trackbook_cmd(&data)
        .arg("import")
        .arg(&out)
        .arg("--force")
        .assert()
        .success()
        .stdout(predicate::str::contains("Import complete!"))
        .stdout(predicate::str::contains("Previous data saved to:"));
}

#[test]
fn test_import_rejects_malformed_file() {
    let data = TempDir::new().unwrap();
    let bad = data.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();

    trackbook_cmd(&data)
        .arg("import")
        .arg(&bad)
        .arg("--force")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed snapshot document"));
}

#[test]
fn test_import_rejects_newer_schema() {
    let data = TempDir::new().unwrap();
    let newer = data.path().join("newer.json");
    std::fs::write(
        &newer,
        r#"{
            "metadata": {
                "createdAt": "2026-01-01T00:00:00Z",
                "appVersion": "9.0.0",
                "deviceName": "future",
                "schemaVersion": 99
            },
            "entityCollections": {}
        }"#,
    )
    .unwrap();

    trackbook_cmd(&data)
        .arg("import")
        .arg(&newer)
        .arg("--force")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Incompatible snapshot schema"));
}

#[test]
fn test_backup_create_and_list() {
    let data = TempDir::new().unwrap();
    let cloud = TempDir::new().unwrap();

    trackbook_with_cloud(&data, &cloud)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup_"));

    trackbook_with_cloud(&data, &cloud)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    trackbook_with_cloud(&data, &cloud)
        .args(["backup", "info", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema version: 2"));

    assert!(cloud.path().join("trackbook-backups").is_dir());
}

#[test]
fn test_backup_list_without_cloud_fails() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .args(["backup", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cloud storage unavailable"));
}

#[test]
fn test_backup_restore_missing_backup() {
    let data = TempDir::new().unwrap();
    let cloud = TempDir::new().unwrap();

    trackbook_with_cloud(&data, &cloud)
        .args(["backup", "restore", "latest", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_wipe_requires_force() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .arg("wipe")
        .assert()
        .success()
        .stdout(predicate::str::contains("trackbook wipe --force"));
}

#[test]
fn test_maintenance_enable_and_status() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .args(["maintenance", "enable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Automatic backup enabled"));

    trackbook_cmd(&data)
        .args(["maintenance", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Automatic backup: enabled"))
        .stdout(predicate::str::contains("daily-cloud-backup"));
}

#[test]
fn test_maintenance_catch_up_runs_cleanup_once_per_day() {
    let data = TempDir::new().unwrap();

    trackbook_cmd(&data)
        .args(["maintenance", "catch-up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("activity-log-cleanup: succeeded"));

    trackbook_cmd(&data)
        .args(["maintenance", "catch-up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("activity-log-cleanup: skipped"));
}

#[test]
fn test_commands_refused_while_another_process_imports() {
    let data = TempDir::new().unwrap();
    let locks = data.path().join("locks");
    std::fs::create_dir_all(&locks).unwrap();
    std::fs::write(
        locks.join("dataset.lock"),
        format!(
            r#"{{"pid": {}, "acquired_at": "{}", "operation": "import"}}"#,
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        ),
    )
    .unwrap();

    trackbook_cmd(&data)
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dataset is busy"));

    std::fs::remove_file(locks.join("dataset.lock")).unwrap();
    trackbook_cmd(&data).arg("export").assert().success();
}
